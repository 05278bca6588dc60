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

use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::Path;

use crate::ffi;

/// The argument of an ioctl.
#[derive(Debug)]
pub enum IoctlArg<'a> {
    /// Passed by value.
    Val(u64),
    /// A buffer the kernel only reads.
    In(&'a [u8]),
    /// A buffer the kernel reads and writes back.
    InOut(&'a mut [u8]),
}

/// The boundary between the VFIO protocol and the operating system.
pub trait Kernel: Debug + Send + Sync + 'static {
    /// Opens a device node for reading and writing.
    fn open(&self, path: &Path) -> io::Result<File>;

    /// Issues `code` on `fd` and returns the non-negative result.
    ///
    /// # Safety
    ///
    /// `arg` must have the layout the kernel expects for `code`. If `code`
    /// returns a new file descriptor, the caller owns it.
    unsafe fn ioctl(&self, fd: BorrowedFd<'_>, code: u32, arg: IoctlArg<'_>) -> io::Result<i32>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HostKernel;

impl Kernel for HostKernel {
    fn open(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().read(true).write(true).open(path)
    }

    unsafe fn ioctl(&self, fd: BorrowedFd<'_>, code: u32, arg: IoctlArg<'_>) -> io::Result<i32> {
        let fd = fd.as_raw_fd();
        match arg {
            IoctlArg::Val(val) => {
                ffi!(unsafe { libc::ioctl(fd, code as _, val as libc::c_ulong) })
            }
            IoctlArg::In(buf) => ffi!(unsafe { libc::ioctl(fd, code as _, buf.as_ptr()) }),
            IoctlArg::InOut(buf) => {
                ffi!(unsafe { libc::ioctl(fd, code as _, buf.as_mut_ptr()) })
            }
        }
    }
}
