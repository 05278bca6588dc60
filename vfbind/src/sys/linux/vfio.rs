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

use std::fmt;

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::c_enum;
use crate::sys::ioctl::ioctl_io;

pub const VFIO_TYPE: u8 = b';';
pub const VFIO_BASE: u8 = 100;

pub const VFIO_API_VERSION: i32 = 0;

pub const VFIO_CONTAINER_PATH: &str = "/dev/vfio/vfio";
pub const VFIO_GROUP_DIR: &str = "/dev/vfio";

c_enum! {
    pub struct VfioIommu(u32);
    {
        TYPE1 = 1;
        SPAPR_TCE = 2;
        TYPE1_V2 = 3;
        DMA_CC = 4;
        EEH = 5;
        TYPE1_NESTING = 6;
        SPAPR_TCE_V2 = 7;
        NOIOMMU = 8;
    }
}

/// VFIO operations and their offsets from [`VFIO_BASE`].
///
/// The offsets are part of the kernel ABI. None of these operations encode
/// an argument size in the request code; the structures carry `argsz`
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VfioOp {
    GetApiVersion,
    CheckExtension,
    GroupGetStatus,
    GroupSetContainer,
    GroupUnsetContainer,
    GroupGetDeviceFd,
    DeviceGetInfo,
    DeviceReset,
}

impl VfioOp {
    pub const ALL: [VfioOp; 8] = [
        VfioOp::GetApiVersion,
        VfioOp::CheckExtension,
        VfioOp::GroupGetStatus,
        VfioOp::GroupSetContainer,
        VfioOp::GroupUnsetContainer,
        VfioOp::GroupGetDeviceFd,
        VfioOp::DeviceGetInfo,
        VfioOp::DeviceReset,
    ];

    pub const fn offset(self) -> u8 {
        match self {
            VfioOp::GetApiVersion => 0,
            VfioOp::CheckExtension => 1,
            VfioOp::GroupGetStatus => 3,
            VfioOp::GroupSetContainer => 4,
            VfioOp::GroupUnsetContainer => 5,
            VfioOp::GroupGetDeviceFd => 6,
            VfioOp::DeviceGetInfo => 7,
            VfioOp::DeviceReset => 11,
        }
    }

    pub const fn code(self) -> u32 {
        ioctl_io(VFIO_TYPE, VFIO_BASE + self.offset())
    }

    pub const fn name(self) -> &'static str {
        match self {
            VfioOp::GetApiVersion => "VFIO_GET_API_VERSION",
            VfioOp::CheckExtension => "VFIO_CHECK_EXTENSION",
            VfioOp::GroupGetStatus => "VFIO_GROUP_GET_STATUS",
            VfioOp::GroupSetContainer => "VFIO_GROUP_SET_CONTAINER",
            VfioOp::GroupUnsetContainer => "VFIO_GROUP_UNSET_CONTAINER",
            VfioOp::GroupGetDeviceFd => "VFIO_GROUP_GET_DEVICE_FD",
            VfioOp::DeviceGetInfo => "VFIO_DEVICE_GET_INFO",
            VfioOp::DeviceReset => "VFIO_DEVICE_RESET",
        }
    }

    pub fn from_code(code: u32) -> Option<VfioOp> {
        VfioOp::ALL.into_iter().find(|op| op.code() == code)
    }
}

impl fmt::Display for VfioOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const VFIO_GET_API_VERSION: u32 = VfioOp::GetApiVersion.code();
pub const VFIO_CHECK_EXTENSION: u32 = VfioOp::CheckExtension.code();
pub const VFIO_GROUP_GET_STATUS: u32 = VfioOp::GroupGetStatus.code();
pub const VFIO_GROUP_SET_CONTAINER: u32 = VfioOp::GroupSetContainer.code();
pub const VFIO_GROUP_UNSET_CONTAINER: u32 = VfioOp::GroupUnsetContainer.code();
pub const VFIO_GROUP_GET_DEVICE_FD: u32 = VfioOp::GroupGetDeviceFd.code();
pub const VFIO_DEVICE_GET_INFO: u32 = VfioOp::DeviceGetInfo.code();
pub const VFIO_DEVICE_RESET: u32 = VfioOp::DeviceReset.code();

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct VfioGroupFlag: u32 {
        const VIABLE = 1 << 0;
        const CONTAINER_SET = 1 << 1;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct VfioGroupStatus {
    pub argsz: u32,
    pub flags: u32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct VfioDeviceInfoFlag: u32 {
        const RESET = 1 << 0;
        const PCI = 1 << 1;
        const PLATFORM = 1 << 2;
        const AMBA  = 1 << 3;
        const CCW = 1 << 4;
        const AP = 1 << 5;
        const FSL_MC = 1 << 6;
        const CAPS = 1 << 7;
        const CDX = 1 << 8;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct VfioDeviceInfo {
    pub argsz: u32,
    pub flags: u32,
    pub num_regions: u32,
    pub num_irqs: u32,
}

#[cfg(test)]
#[path = "vfio_test.rs"]
mod tests;
