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

//! Container, group and device binding in the order the kernel requires.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::ResultExt;

use crate::sys::vfio::{VFIO_CONTAINER_PATH, VFIO_GROUP_DIR, VfioIommu, VfioOp};
use crate::vfio::container::Container;
use crate::vfio::device::{Device, DeviceInfo};
use crate::vfio::group::{Group, GroupStatus};
use crate::vfio::kernel::Kernel;
use crate::vfio::{Result, Target, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    ContainerOpen,
    GroupOpen,
    GroupViable,
    GroupBound,
    DeviceResolved,
    DeviceInfoRead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Id(u32),
    Path(PathBuf),
}

#[derive(Debug)]
pub struct Binding<K: Kernel> {
    pub device: Device<K>,
    pub container: Arc<Container<K>>,
    pub info: DeviceInfo,
    /// Extensions asked for with [`Binder::extensions`] and whether the
    /// container supports them.
    pub extensions: Vec<(VfioIommu, bool)>,
    /// Group status before and after attaching the container.
    pub status: [GroupStatus; 2],
}

impl<K: Kernel> Binding<K> {
    pub fn group(&self) -> &Arc<Group<K>> {
        self.device.group()
    }
}

/// Drives one device from nothing to bound and described.
///
/// A binder is consumed by [`Binder::bind`], so a failed binding cannot be
/// resumed.
#[derive(Debug)]
pub struct Binder<K: Kernel> {
    kernel: Arc<K>,
    container_path: PathBuf,
    group_dir: PathBuf,
    api_version: Option<i32>,
    extensions: Vec<VfioIommu>,
    stage: Stage,
}

impl<K: Kernel> Binder<K> {
    pub fn new(kernel: Arc<K>) -> Self {
        Binder {
            kernel,
            container_path: PathBuf::from(VFIO_CONTAINER_PATH),
            group_dir: PathBuf::from(VFIO_GROUP_DIR),
            api_version: None,
            extensions: vec![],
            stage: Stage::Init,
        }
    }

    pub fn container_path(mut self, path: impl AsRef<Path>) -> Self {
        self.container_path = path.as_ref().to_owned();
        self
    }

    pub fn group_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.group_dir = dir.as_ref().to_owned();
        self
    }

    /// Refuses containers speaking another API version. Checked before any
    /// group is opened.
    pub fn api_version(mut self, version: i32) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Extensions to query right after the container is opened.
    pub fn extensions(mut self, extensions: impl IntoIterator<Item = VfioIommu>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage);
        log::debug!("binder: {:?} -> {next:?}", self.stage);
        self.stage = next;
    }

    pub fn bind(mut self, group: &GroupRef, label: &str) -> Result<Binding<K>> {
        let ret = self.try_bind(group, label);
        ret.context(error::Bind { stage: self.stage })
    }

    fn try_bind(&mut self, group: &GroupRef, label: &str) -> Result<Binding<K>> {
        let container = Container::open_path(self.kernel.clone(), &self.container_path)?;
        let container = Arc::new(container);
        self.advance(Stage::ContainerOpen);

        if let Some(expected) = self.api_version {
            let found = container.api_version()?;
            if found != expected {
                return error::ApiVersion { expected, found }.fail();
            }
        }
        let mut extensions = Vec::with_capacity(self.extensions.len());
        for &extension in &self.extensions {
            let supported = container.check_extension(extension)?;
            extensions.push((extension, supported));
        }

        let path = match group {
            GroupRef::Id(id) => self.group_dir.join(id.to_string()),
            GroupRef::Path(path) => path.clone(),
        };
        let mut group = Group::open_path(self.kernel.clone(), path)?;
        self.advance(Stage::GroupOpen);

        let before = group.status()?;
        if !before.is_viable() {
            return error::PreconditionViolated {
                op: VfioOp::GroupSetContainer,
                target: Target::Group(group.id()),
                reason: format!("group is not viable, status: {:?}", before.flags),
            }
            .fail();
        }
        self.advance(Stage::GroupViable);

        group.bind(container.clone())?;
        let after = group.status()?;
        if !after.container_set() {
            return error::UnexpectedStatus {
                group: group.id(),
                flags: after.flags,
            }
            .fail();
        }
        self.advance(Stage::GroupBound);

        let device = Device::resolve(Arc::new(group), label)?;
        self.advance(Stage::DeviceResolved);

        let info = device.info()?;
        self.advance(Stage::DeviceInfoRead);

        Ok(Binding {
            device,
            container,
            info,
            extensions,
            status: [before, after],
        })
    }
}
