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
use std::path::Path;
use std::sync::Arc;

use snafu::ResultExt;

use crate::sys::vfio::{VFIO_CONTAINER_PATH, VfioIommu, VfioOp};
use crate::vfio::ioctls::{vfio_check_extension, vfio_get_api_version};
use crate::vfio::kernel::Kernel;
use crate::vfio::{Result, Target, error};

#[derive(Debug)]
pub struct Container<K: Kernel> {
    kernel: Arc<K>,
    fd: File,
}

impl<K: Kernel> Container<K> {
    pub fn open(kernel: Arc<K>) -> Result<Self> {
        Self::open_path(kernel, VFIO_CONTAINER_PATH)
    }

    pub fn open_path(kernel: Arc<K>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let fd = kernel.open(path).context(error::OpenFailed { path })?;
        log::debug!("container-{}: opened {path:?}", fd.as_raw_fd());
        Ok(Container { kernel, fd })
    }

    pub fn fd(&self) -> &File {
        &self.fd
    }

    pub fn kernel(&self) -> &Arc<K> {
        &self.kernel
    }

    fn target(&self) -> Target {
        Target::Container(self.fd.as_raw_fd())
    }

    pub fn api_version(&self) -> Result<i32> {
        let version = vfio_get_api_version(&*self.kernel, &self.fd).context(error::IoctlFailed {
            op: VfioOp::GetApiVersion,
            target: self.target(),
        })?;
        Ok(version)
    }

    /// Queries the kernel every time; nothing is cached.
    pub fn check_extension(&self, extension: impl Into<VfioIommu>) -> Result<bool> {
        let extension = extension.into();
        let ret = vfio_check_extension(&*self.kernel, &self.fd, extension).context(
            error::IoctlFailed {
                op: VfioOp::CheckExtension,
                target: self.target(),
            },
        )?;
        log::debug!(
            "container-{}: {extension:?} supported: {}",
            self.fd.as_raw_fd(),
            ret > 0
        );
        Ok(ret > 0)
    }
}

#[cfg(test)]
#[path = "container_test.rs"]
mod tests;
