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
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::{OptionExt, ResultExt};

use crate::sys::vfio::{VFIO_GROUP_DIR, VfioGroupFlag, VfioGroupStatus, VfioOp};
use crate::vfio::container::Container;
use crate::vfio::ioctls::{
    vfio_group_get_status, vfio_group_set_container, vfio_group_unset_container,
};
use crate::vfio::kernel::Kernel;
use crate::vfio::{Result, Target, error};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStatus {
    pub flags: VfioGroupFlag,
}

impl GroupStatus {
    pub fn is_viable(&self) -> bool {
        self.flags.contains(VfioGroupFlag::VIABLE)
    }

    pub fn container_set(&self) -> bool {
        self.flags.contains(VfioGroupFlag::CONTAINER_SET)
    }
}

/// Extracts the group id from a group node name, either `<id>` or
/// `noiommu-<id>`.
pub fn parse_group_id(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let id = name.strip_prefix("noiommu-").unwrap_or(name);
    id.parse().ok()
}

pub fn group_path(id: u32) -> PathBuf {
    Path::new(VFIO_GROUP_DIR).join(id.to_string())
}

#[derive(Debug)]
pub struct Group<K: Kernel> {
    id: u32,
    kernel: Arc<K>,
    container: Option<Arc<Container<K>>>,
    fd: File,
}

impl<K: Kernel> Group<K> {
    pub fn open(kernel: Arc<K>, id: u32) -> Result<Self> {
        Self::open_path(kernel, group_path(id))
    }

    pub fn open_path(kernel: Arc<K>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let id = parse_group_id(path).context(error::InvalidGroupPath { path })?;
        let fd = kernel.open(path).context(error::OpenFailed { path })?;
        log::debug!("group-{id}: opened {path:?} as fd {}", fd.as_raw_fd());
        Ok(Group {
            id,
            kernel,
            container: None,
            fd,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn fd(&self) -> &File {
        &self.fd
    }

    pub fn kernel(&self) -> &Arc<K> {
        &self.kernel
    }

    pub fn container(&self) -> Option<&Arc<Container<K>>> {
        self.container.as_ref()
    }

    pub fn status(&self) -> Result<GroupStatus> {
        let mut status = VfioGroupStatus {
            argsz: size_of::<VfioGroupStatus>() as u32,
            flags: 0,
        };
        vfio_group_get_status(&*self.kernel, &self.fd, &mut status).context(
            error::IoctlFailed {
                op: VfioOp::GroupGetStatus,
                target: Target::Group(self.id),
            },
        )?;
        let flags = VfioGroupFlag::from_bits_retain(status.flags);
        log::debug!("group-{}: status {flags:?}", self.id);
        Ok(GroupStatus { flags })
    }

    /// Attaches the group to `container`.
    ///
    /// Viability is not checked here. Binding again to the same container
    /// is a no-op.
    pub fn bind(&mut self, container: Arc<Container<K>>) -> Result<()> {
        if let Some(current) = &self.container {
            if Arc::ptr_eq(current, &container) {
                return Ok(());
            }
            return error::PreconditionViolated {
                op: VfioOp::GroupSetContainer,
                target: Target::Group(self.id),
                reason: format!(
                    "already bound to container-{}",
                    current.fd().as_raw_fd()
                ),
            }
            .fail();
        }
        let container_fd = container.fd().as_raw_fd();
        vfio_group_set_container(&*self.kernel, &self.fd, &container_fd).context(
            error::IoctlFailed {
                op: VfioOp::GroupSetContainer,
                target: Target::Group(self.id),
            },
        )?;
        log::debug!("group-{}: bound to container-{container_fd}", self.id);
        self.container.replace(container);
        Ok(())
    }

    pub fn unbind(&mut self) -> Result<()> {
        if self.container.is_none() {
            return Ok(());
        }
        vfio_group_unset_container(&*self.kernel, &self.fd).context(error::IoctlFailed {
            op: VfioOp::GroupUnsetContainer,
            target: Target::Group(self.id),
        })?;
        log::debug!("group-{}: unbound", self.id);
        self.container = None;
        Ok(())
    }
}

impl<K: Kernel> Drop for Group<K> {
    fn drop(&mut self) {
        if let Err(e) = self.unbind() {
            log::error!("group-{}: unbinding from container: {e}", self.id);
        }
    }
}

#[cfg(test)]
#[path = "group_test.rs"]
mod tests;
