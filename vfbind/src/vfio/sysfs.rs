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

use std::fs;
use std::path::Path;

use snafu::{OptionExt, ResultExt};

use crate::vfio::group::parse_group_id;
use crate::vfio::{Result, error};

pub const SYSFS_PATH: &str = "/sys";

/// Looks up the IOMMU group of a PCI device through the `iommu_group` link
/// under `<sysfs>/bus/pci/devices/<addr>`.
pub fn iommu_group(sysfs: &Path, addr: &str) -> Result<u32> {
    let link = sysfs.join("bus/pci/devices").join(addr).join("iommu_group");
    let target = fs::read_link(&link).context(error::NoIommuGroup { addr })?;
    let id = parse_group_id(&target).context(error::InvalidGroupPath { path: &target })?;
    log::debug!("{addr}: in IOMMU group {id}");
    Ok(id)
}

#[cfg(test)]
#[path = "sysfs_test.rs"]
mod tests;
