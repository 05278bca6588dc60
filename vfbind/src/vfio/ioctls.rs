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

use std::fs::File;
use std::io::{self, ErrorKind};
use std::os::fd::{AsFd, FromRawFd};

use zerocopy::IntoBytes;

use crate::sys::vfio::{VfioDeviceInfo, VfioGroupStatus, VfioIommu, VfioOp};
use crate::vfio::kernel::{IoctlArg, Kernel};

fn vfio_ioctl<K: Kernel + ?Sized>(
    kernel: &K,
    fd: &File,
    op: VfioOp,
    arg: IoctlArg<'_>,
) -> io::Result<i32> {
    log::trace!("{op}({:#x}): {arg:x?}", op.code());
    // Every caller below passes an argument typed after the kernel
    // structure of `op`.
    unsafe { kernel.ioctl(fd.as_fd(), op.code(), arg) }
}

pub fn vfio_get_api_version<K: Kernel + ?Sized>(kernel: &K, container: &File) -> io::Result<i32> {
    vfio_ioctl(kernel, container, VfioOp::GetApiVersion, IoctlArg::Val(0))
}

pub fn vfio_check_extension<K: Kernel + ?Sized>(
    kernel: &K,
    container: &File,
    extension: VfioIommu,
) -> io::Result<i32> {
    let arg = IoctlArg::Val(extension.raw() as u64);
    vfio_ioctl(kernel, container, VfioOp::CheckExtension, arg)
}

pub fn vfio_group_get_status<K: Kernel + ?Sized>(
    kernel: &K,
    group: &File,
    status: &mut VfioGroupStatus,
) -> io::Result<i32> {
    let arg = IoctlArg::InOut(status.as_mut_bytes());
    vfio_ioctl(kernel, group, VfioOp::GroupGetStatus, arg)
}

pub fn vfio_group_set_container<K: Kernel + ?Sized>(
    kernel: &K,
    group: &File,
    container: &i32,
) -> io::Result<i32> {
    let arg = IoctlArg::In(container.as_bytes());
    vfio_ioctl(kernel, group, VfioOp::GroupSetContainer, arg)
}

pub fn vfio_group_unset_container<K: Kernel + ?Sized>(
    kernel: &K,
    group: &File,
) -> io::Result<i32> {
    vfio_ioctl(kernel, group, VfioOp::GroupUnsetContainer, IoctlArg::Val(0))
}

/// `label` must end with a zero byte.
pub fn vfio_group_get_device_fd<K: Kernel + ?Sized>(
    kernel: &K,
    group: &File,
    label: &[u8],
) -> io::Result<File> {
    if label.last() != Some(&0) {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            "device label is not nul-terminated",
        ));
    }
    let fd = vfio_ioctl(kernel, group, VfioOp::GroupGetDeviceFd, IoctlArg::In(label))?;
    Ok(unsafe { File::from_raw_fd(fd) })
}

pub fn vfio_device_get_info<K: Kernel + ?Sized>(
    kernel: &K,
    device: &File,
    info: &mut VfioDeviceInfo,
) -> io::Result<i32> {
    let arg = IoctlArg::InOut(info.as_mut_bytes());
    vfio_ioctl(kernel, device, VfioOp::DeviceGetInfo, arg)
}

pub fn vfio_device_reset<K: Kernel + ?Sized>(kernel: &K, device: &File) -> io::Result<i32> {
    vfio_ioctl(kernel, device, VfioOp::DeviceReset, IoctlArg::Val(0))
}
