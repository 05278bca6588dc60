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

pub mod bind;
pub mod container;
pub mod device;
pub mod group;
pub mod ioctls;
pub mod kernel;
pub mod sysfs;

use std::fmt;
use std::path::PathBuf;

use snafu::Snafu;

use crate::sys::vfio::{VfioGroupFlag, VfioOp};

pub use self::bind::{Binder, Binding, GroupRef, Stage};
pub use self::container::Container;
pub use self::device::{Device, DeviceInfo};
pub use self::group::{Group, GroupStatus};
pub use self::kernel::{HostKernel, IoctlArg, Kernel};

/// The handle an operation was issued on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Container(i32),
    Group(u32),
    Device(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Container(fd) => write!(f, "container-{fd}"),
            Target::Group(id) => write!(f, "group-{id}"),
            Target::Device(label) => write!(f, "device-{label}"),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
pub enum Error {
    #[snafu(display("Cannot open {path:?}"))]
    OpenFailed {
        path: PathBuf,
        #[snafu(source)]
        error: std::io::Error,
    },
    #[snafu(display("{op} on {target} failed"))]
    IoctlFailed {
        op: VfioOp,
        target: Target,
        #[snafu(source)]
        error: std::io::Error,
    },
    #[snafu(display("{op} on {target} not allowed: {reason}"))]
    PreconditionViolated {
        op: VfioOp,
        target: Target,
        reason: String,
    },
    #[snafu(display("Container speaks VFIO API version {found}, want {expected}"))]
    ApiVersion { expected: i32, found: i32 },
    #[snafu(display("group-{group} reports {flags:?} after being bound"))]
    UnexpectedStatus { group: u32, flags: VfioGroupFlag },
    #[snafu(display("Cannot parse a group id from {path:?}"))]
    InvalidGroupPath { path: PathBuf },
    #[snafu(display("Cannot find the IOMMU group of {addr}"))]
    NoIommuGroup {
        addr: String,
        #[snafu(source)]
        error: std::io::Error,
    },
    #[snafu(display("Binding failed at {stage:?}"))]
    Bind {
        stage: Stage,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
}

impl Error {
    /// The OS error code behind this error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::OpenFailed { error, .. }
            | Error::IoctlFailed { error, .. }
            | Error::NoIommuGroup { error, .. } => error.raw_os_error(),
            Error::Bind { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "vfio_test.rs"]
pub(crate) mod tests;
