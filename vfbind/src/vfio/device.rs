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
use std::os::fd::AsRawFd;
use std::sync::Arc;

use snafu::ResultExt;

use crate::sys::vfio::{VfioDeviceInfo, VfioDeviceInfoFlag, VfioOp};
use crate::vfio::container::Container;
use crate::vfio::group::Group;
use crate::vfio::ioctls::{vfio_device_get_info, vfio_device_reset, vfio_group_get_device_fd};
use crate::vfio::kernel::Kernel;
use crate::vfio::{Result, Target, error};

/// Copies `label` and appends a zero byte. Bytes of `label` are kept
/// as-is, including any embedded zero.
pub fn encode_label(label: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(label.len() + 1);
    buf.extend_from_slice(label.as_bytes());
    buf.push(0);
    buf
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub flags: VfioDeviceInfoFlag,
    pub num_regions: u32,
    pub num_irqs: u32,
}

impl From<VfioDeviceInfo> for DeviceInfo {
    fn from(info: VfioDeviceInfo) -> Self {
        DeviceInfo {
            flags: VfioDeviceInfoFlag::from_bits_retain(info.flags),
            num_regions: info.num_regions,
            num_irqs: info.num_irqs,
        }
    }
}

/// A device resolved from a group. Keeps the group, and through it the
/// container, alive.
#[derive(Debug)]
pub struct Device<K: Kernel> {
    label: String,
    fd: File,
    group: Arc<Group<K>>,
}

impl<K: Kernel> Device<K> {
    pub fn resolve(group: Arc<Group<K>>, label: &str) -> Result<Self> {
        if group.container().is_none() {
            return error::PreconditionViolated {
                op: VfioOp::GroupGetDeviceFd,
                target: Target::Group(group.id()),
                reason: "group is not bound to a container",
            }
            .fail();
        }
        let buf = encode_label(label);
        let fd = vfio_group_get_device_fd(&**group.kernel(), group.fd(), &buf).context(
            error::IoctlFailed {
                op: VfioOp::GroupGetDeviceFd,
                target: Target::Group(group.id()),
            },
        )?;
        log::debug!(
            "group-{}: resolved {label} as fd {}",
            group.id(),
            fd.as_raw_fd()
        );
        Ok(Device {
            label: label.to_owned(),
            fd,
            group,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn fd(&self) -> &File {
        &self.fd
    }

    pub fn group(&self) -> &Arc<Group<K>> {
        &self.group
    }

    pub fn container(&self) -> Option<&Arc<Container<K>>> {
        self.group.container()
    }

    fn target(&self) -> Target {
        Target::Device(self.label.clone())
    }

    pub fn info(&self) -> Result<DeviceInfo> {
        let mut info = VfioDeviceInfo {
            argsz: size_of::<VfioDeviceInfo>() as u32,
            ..Default::default()
        };
        vfio_device_get_info(&**self.group.kernel(), &self.fd, &mut info).context(
            error::IoctlFailed {
                op: VfioOp::DeviceGetInfo,
                target: self.target(),
            },
        )?;
        let info = DeviceInfo::from(info);
        log::debug!("device-{}: {info:x?}", self.label);
        Ok(info)
    }

    pub fn reset(&self) -> Result<()> {
        let info = self.info()?;
        if !info.flags.contains(VfioDeviceInfoFlag::RESET) {
            return error::PreconditionViolated {
                op: VfioOp::DeviceReset,
                target: self.target(),
                reason: "device does not support reset",
            }
            .fail();
        }
        vfio_device_reset(&**self.group.kernel(), &self.fd).context(error::IoctlFailed {
            op: VfioOp::DeviceReset,
            target: self.target(),
        })?;
        log::debug!("device-{}: reset", self.label);
        Ok(())
    }
}

#[cfg(test)]
#[path = "device_test.rs"]
mod tests;
