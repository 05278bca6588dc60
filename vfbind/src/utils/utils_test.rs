// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use assert_matches::assert_matches;

c_enum! {
    struct Color(u16);
    {
        RED = 1;
        BLUE = 4;
    }
}

#[test]
fn test_c_enum_debug() {
    assert_eq!(format!("{:?}", Color::RED), "Color::RED");
    assert_eq!(format!("{:?}", Color::from(4)), "Color::BLUE");
    assert_eq!(format!("{:?}", Color::from(7)), "Color(7)");
    assert_eq!(u16::from(Color::BLUE), 4);
    assert_eq!(Color::RED.raw(), 1);
}

#[test]
fn test_ffi() {
    let ok: std::io::Result<i32> = ffi!(3);
    assert_matches!(ok, Ok(3));
    let err: std::io::Result<i32> = ffi!(unsafe { libc::close(-1) });
    assert_matches!(err, Err(e) if e.raw_os_error() == Some(libc::EBADF));
    let sentinel: std::io::Result<i32> = ffi!(0, 0);
    assert!(sentinel.is_err());
}
