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

//! Network services and their VFIO devices, discovered from environment
//! variables named `NSM_VFS_<service>` that point at JSON files.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use snafu::{ResultExt, Snafu};

pub const NSM_VFS_PREFIX: &str = "NSM_VFS_";

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
pub enum Error {
    #[snafu(display("No {NSM_VFS_PREFIX}* variable found in the environment"))]
    NoNetworkService,
    #[snafu(display("Cannot read {path:?} of network service {service}"))]
    ReadConfig {
        service: String,
        path: PathBuf,
        #[snafu(source)]
        error: std::io::Error,
    },
    #[snafu(display("Cannot parse {path:?} of network service {service}"))]
    ParseConfig {
        service: String,
        path: PathBuf,
        #[snafu(source)]
        error: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VfioConfig {
    /// Path to the group node, e.g. `/dev/vfio/5`.
    pub vfio_device: PathBuf,
    /// PCI address of the device, e.g. `0000:01:00.0`.
    pub pci_addr: String,
}

pub type NetworkServices = BTreeMap<String, Vec<VfioConfig>>;

/// Environment variables whose name and value are valid UTF-8.
pub fn env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

/// Loads the config of every `NSM_VFS_*` variable in `vars`.
pub fn load_network_services<I>(vars: I) -> Result<NetworkServices>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut services = NetworkServices::new();
    let mut found = false;
    for (key, val) in vars {
        let Some(service) = key.strip_prefix(NSM_VFS_PREFIX) else {
            continue;
        };
        if service.is_empty() {
            log::warn!("{key}: no network service name, ignored");
            continue;
        }
        found = true;
        let path = PathBuf::from(val);
        let content = fs::read_to_string(&path).context(error::ReadConfig {
            service,
            path: &path,
        })?;
        let configs: Vec<VfioConfig> =
            serde_json::from_str(&content).context(error::ParseConfig {
                service,
                path: &path,
            })?;
        log::debug!("{service}: {} device(s) from {path:?}", configs.len());
        services.insert(service.to_owned(), configs);
    }
    if !found {
        return error::NoNetworkService.fail();
    }
    Ok(services)
}

/// Lists every service and its devices, one line each.
pub struct Services<'a>(pub &'a NetworkServices);

impl fmt::Display for Services<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, configs) in self.0 {
            writeln!(f, "Network service: {name}")?;
            for config in configs {
                writeln!(
                    f,
                    "\tdevice: {} pci address: {}",
                    config.vfio_device.display(),
                    config.pci_addr
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
