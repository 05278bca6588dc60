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

//! Request codes in the layout of the kernel's `_IOC()` macro.
//!
//! From the least significant bit: 8 bits of sequence number, 8 bits of
//! type, 14 bits of argument size and 2 bits of direction.

use std::mem::size_of;

use crate::c_enum;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_DIRBITS: u32 = 2;

const IOC_NRMASK: u32 = (1 << IOC_NRBITS) - 1;
const IOC_TYPEMASK: u32 = (1 << IOC_TYPEBITS) - 1;
const IOC_SIZEMASK: u32 = (1 << IOC_SIZEBITS) - 1;
const IOC_DIRMASK: u32 = (1 << IOC_DIRBITS) - 1;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

c_enum! {
    pub struct IocDir(u32);
    {
        NONE = 0;
        WRITE = 1;
        READ = 2;
        READ_WRITE = 3;
    }
}

pub const fn ioctl_ioc(dir: IocDir, type_: u8, nr: u8, size: u32) -> u32 {
    assert!(size <= IOC_SIZEMASK, "ioctl argument too large");
    ((dir.raw() & IOC_DIRMASK) << IOC_DIRSHIFT)
        | (size << IOC_SIZESHIFT)
        | ((type_ as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

pub const fn ioctl_io(type_: u8, nr: u8) -> u32 {
    ioctl_ioc(IocDir::NONE, type_, nr, 0)
}

pub const fn ioctl_ior<T>(type_: u8, nr: u8) -> u32 {
    ioctl_ioc(IocDir::READ, type_, nr, size_of::<T>() as u32)
}

pub const fn ioctl_iow<T>(type_: u8, nr: u8) -> u32 {
    ioctl_ioc(IocDir::WRITE, type_, nr, size_of::<T>() as u32)
}

pub const fn ioctl_iowr<T>(type_: u8, nr: u8) -> u32 {
    ioctl_ioc(IocDir::READ_WRITE, type_, nr, size_of::<T>() as u32)
}

pub const fn ioctl_dir(code: u32) -> IocDir {
    IocDir((code >> IOC_DIRSHIFT) & IOC_DIRMASK)
}

pub const fn ioctl_type(code: u32) -> u8 {
    ((code >> IOC_TYPESHIFT) & IOC_TYPEMASK) as u8
}

pub const fn ioctl_nr(code: u32) -> u8 {
    ((code >> IOC_NRSHIFT) & IOC_NRMASK) as u8
}

pub const fn ioctl_size(code: u32) -> u32 {
    (code >> IOC_SIZESHIFT) & IOC_SIZEMASK
}

#[cfg(test)]
#[path = "ioctl_test.rs"]
mod tests;
