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

use std::fs;
use std::os::unix::fs::symlink;

use assert_matches::assert_matches;
use tempdir::TempDir;

use crate::vfio::Error;
use crate::vfio::sysfs::iommu_group;

const ADDR: &str = "0000:01:00.0";

fn fixture_sysfs(group_link: &str) -> TempDir {
    let sysfs = TempDir::new("vfbind-sysfs").unwrap();
    let dev = sysfs.path().join("bus/pci/devices").join(ADDR);
    fs::create_dir_all(&dev).unwrap();
    symlink(group_link, dev.join("iommu_group")).unwrap();
    sysfs
}

#[test]
fn test_iommu_group() {
    let sysfs = fixture_sysfs("../../../../kernel/iommu_groups/12");
    assert_matches!(iommu_group(sysfs.path(), ADDR), Ok(12));
}

#[test]
fn test_iommu_group_missing() {
    let sysfs = fixture_sysfs("../../../../kernel/iommu_groups/12");
    let err = iommu_group(sysfs.path(), "0000:02:00.0").unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    assert_matches!(err, Error::NoIommuGroup { addr, .. } if addr == "0000:02:00.0");
}

#[test]
fn test_iommu_group_invalid() {
    let sysfs = fixture_sysfs("../../../../kernel/iommu_groups/bogus");
    assert_matches!(
        iommu_group(sysfs.path(), ADDR),
        Err(Error::InvalidGroupPath { .. })
    );
}
