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
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use snafu::{OptionExt, ResultExt, Snafu};
use vfbind::sys::vfio::{VFIO_API_VERSION, VfioIommu};
use vfbind::vfio::sysfs::{SYSFS_PATH, iommu_group};
use vfbind::vfio::{Binder, Binding, DeviceInfo, GroupRef, GroupStatus, HostKernel, Kernel};

use crate::config::{self, NetworkServices, env_vars, load_network_services};

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
pub enum Error {
    #[snafu(display("Failed to load network services"), context(false))]
    Config { source: config::Error },
    #[snafu(display("Network service {name} is not configured"))]
    UnknownService { name: String },
    #[snafu(display("Network service {name} has no device"))]
    EmptyService { name: String },
    #[snafu(display("Either --device or --network-service is required"))]
    MissingDevice,
    #[snafu(display("Failed to find the IOMMU group of {addr}"))]
    FindGroup {
        addr: String,
        source: vfbind::vfio::Error,
    },
    #[snafu(display("Failed to bind {addr}"))]
    Bind {
        addr: String,
        source: vfbind::vfio::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Args, Debug, Clone, Default)]
pub struct BindArgs {
    /// IOMMU group id, e.g. `5`, or path to a group node, e.g.
    /// `/dev/vfio/5`. Looked up in sysfs if not set.
    #[arg(short, long, value_name = "GROUP")]
    pub group: Option<String>,

    /// PCI address of the device, e.g. `0000:01:00.0`.
    #[arg(short, long, value_name = "ADDR", conflicts_with = "network_service")]
    pub device: Option<String>,

    /// Bind the first device of a network service configured through
    /// `NSM_VFS_<NAME>`.
    #[arg(short, long, value_name = "NAME", conflicts_with = "group")]
    pub network_service: Option<String>,

    /// Where sysfs is mounted.
    #[arg(long, default_value = SYSFS_PATH, value_name = "PATH")]
    pub sysfs: PathBuf,
}

pub fn parse_group_arg(arg: &str) -> GroupRef {
    match arg.parse() {
        Ok(id) => GroupRef::Id(id),
        Err(_) => GroupRef::Path(PathBuf::from(arg)),
    }
}

/// Picks the group and the device label to bind.
pub fn resolve_target<F>(args: &BindArgs, load_services: F) -> Result<(GroupRef, String)>
where
    F: FnOnce() -> config::Result<NetworkServices>,
{
    if let Some(name) = &args.network_service {
        let services = load_services()?;
        let configs = services.get(name).context(error::UnknownService { name })?;
        let config = configs.first().context(error::EmptyService { name })?;
        let group = GroupRef::Path(config.vfio_device.clone());
        return Ok((group, config.pci_addr.clone()));
    }
    let addr = args.device.as_deref().context(error::MissingDevice)?;
    let group = match &args.group {
        Some(group) => parse_group_arg(group),
        None => {
            let id = iommu_group(&args.sysfs, addr).context(error::FindGroup { addr })?;
            GroupRef::Id(id)
        }
    };
    Ok((group, addr.to_owned()))
}

#[derive(Debug)]
pub struct Report {
    pub group: u32,
    pub status: [GroupStatus; 2],
    pub extensions: Vec<(VfioIommu, bool)>,
    pub device: String,
    pub fd: i32,
    pub info: DeviceInfo,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [before, after] = &self.status;
        writeln!(
            f,
            "group-{}: {:?} -> {:?}",
            self.group, before.flags, after.flags
        )?;
        for (extension, supported) in &self.extensions {
            let word = if *supported { "supports" } else { "does not support" };
            writeln!(f, "container {word} {extension:?}")?;
        }
        writeln!(
            f,
            "device {}: fd {}, flags {:?}, {} region(s), {} irq(s)",
            self.device, self.fd, self.info.flags, self.info.num_regions, self.info.num_irqs
        )
    }
}

impl Report {
    pub fn new<K: Kernel>(binding: &Binding<K>) -> Self {
        Report {
            group: binding.group().id(),
            status: binding.status,
            extensions: binding.extensions.clone(),
            device: binding.device.label().to_owned(),
            fd: binding.device.fd().as_raw_fd(),
            info: binding.info,
        }
    }
}

/// Binds `addr` after making sure the container speaks
/// [`VFIO_API_VERSION`].
pub fn bind_device<K: Kernel>(
    kernel: Arc<K>,
    group: &GroupRef,
    addr: &str,
) -> Result<Binding<K>> {
    Binder::new(kernel)
        .api_version(VFIO_API_VERSION)
        .extensions([VfioIommu::TYPE1, VfioIommu::NOIOMMU])
        .bind(group, addr)
        .context(error::Bind { addr })
}

pub fn main_bind(args: BindArgs) -> Result<()> {
    let (group, addr) = resolve_target(&args, || load_network_services(env_vars()))?;
    log::info!("binding {addr} through {group:?}");
    let binding = bind_device(Arc::new(HostKernel), &group, &addr)?;
    print!("{}", Report::new(&binding));
    Ok(())
}

#[cfg(test)]
#[path = "bind_test.rs"]
mod tests;
