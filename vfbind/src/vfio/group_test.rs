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

use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_matches::assert_matches;
use rstest::rstest;
use zerocopy::IntoBytes;

use crate::sys::vfio::{VfioGroupFlag, VfioGroupStatus, VfioOp};
use crate::vfio::container::Container;
use crate::vfio::group::{Group, GroupStatus, group_path, parse_group_id};
use crate::vfio::tests::{CallArg, FakeKernel, GROUP, fake_kernel};
use crate::vfio::{Error, Target};

#[rstest]
#[case(VfioGroupFlag::empty(), false, false)]
#[case(VfioGroupFlag::VIABLE, true, false)]
#[case(VfioGroupFlag::CONTAINER_SET, false, true)]
#[case(VfioGroupFlag::VIABLE | VfioGroupFlag::CONTAINER_SET, true, true)]
#[case(VfioGroupFlag::from_bits_retain(0xfffe), false, true)]
#[case(VfioGroupFlag::from_bits_retain(0x5), true, false)]
fn test_status_flags(
    #[case] flags: VfioGroupFlag,
    #[case] viable: bool,
    #[case] container_set: bool,
) {
    let status = GroupStatus { flags };
    assert_eq!(status.is_viable(), viable);
    assert_eq!(status.container_set(), container_set);
}

#[rstest]
#[case("/dev/vfio/5", Some(5))]
#[case("/dev/vfio/noiommu-12", Some(12))]
#[case("../../../kernel/iommu_groups/31", Some(31))]
#[case("/dev/vfio/vfio", None)]
#[case("/dev/vfio/noiommu-", None)]
fn test_parse_group_id(#[case] path: &str, #[case] id: Option<u32>) {
    assert_eq!(parse_group_id(Path::new(path)), id);
}

#[test]
fn test_group_path() {
    assert_eq!(group_path(42), PathBuf::from("/dev/vfio/42"));
}

#[rstest]
fn test_status_argsz(fake_kernel: Arc<FakeKernel>) {
    let group = Group::open(fake_kernel.clone(), GROUP).unwrap();
    group.status().unwrap();
    let request = VfioGroupStatus { argsz: 8, flags: 0 };
    let calls = fake_kernel.calls();
    assert_eq!(calls[0].arg, CallArg::Buf(request.as_bytes().to_vec()));
}

#[rstest]
fn test_bind_passes_container_fd(fake_kernel: Arc<FakeKernel>) {
    let container = Arc::new(Container::open(fake_kernel.clone()).unwrap());
    let mut group = Group::open(fake_kernel.clone(), GROUP).unwrap();
    group.bind(container.clone()).unwrap();

    let fd = container.fd().as_raw_fd();
    let calls = fake_kernel.calls();
    assert_eq!(calls[0].op, VfioOp::GroupSetContainer);
    assert_eq!(calls[0].arg, CallArg::Buf(fd.to_ne_bytes().to_vec()));
    assert!(Arc::ptr_eq(group.container().unwrap(), &container));
}

#[rstest]
fn test_bind_twice(fake_kernel: Arc<FakeKernel>) {
    let container = Arc::new(Container::open(fake_kernel.clone()).unwrap());
    let mut group = Group::open(fake_kernel.clone(), GROUP).unwrap();
    for _ in 0..3 {
        group.bind(container.clone()).unwrap();
        assert!(group.status().unwrap().container_set());
    }
    let set = fake_kernel.ops();
    let set = set.iter().filter(|op| **op == VfioOp::GroupSetContainer);
    assert_eq!(set.count(), 1);
}

#[rstest]
fn test_bind_other_container(fake_kernel: Arc<FakeKernel>) {
    let container = Arc::new(Container::open(fake_kernel.clone()).unwrap());
    let other = Arc::new(Container::open(fake_kernel.clone()).unwrap());
    let mut group = Group::open(fake_kernel.clone(), GROUP).unwrap();
    group.bind(container.clone()).unwrap();
    assert_matches!(
        group.bind(other),
        Err(Error::PreconditionViolated {
            op: VfioOp::GroupSetContainer,
            target: Target::Group(GROUP),
            ..
        })
    );
    assert_eq!(fake_kernel.ops(), [VfioOp::GroupSetContainer]);
    assert!(Arc::ptr_eq(group.container().unwrap(), &container));
}

#[test]
fn test_bind_not_viable() {
    let kernel = Arc::new(FakeKernel::new().with_group(GROUP, false));
    let container = Arc::new(Container::open(kernel.clone()).unwrap());
    let mut group = Group::open(kernel.clone(), GROUP).unwrap();
    let err = group.bind(container).unwrap_err();
    assert_eq!(
        err.to_string(),
        "VFIO_GROUP_SET_CONTAINER on group-5 failed"
    );
    assert_eq!(err.raw_os_error(), Some(libc::EPERM));
    assert!(group.container().is_none());
}

#[rstest]
fn test_unbind(fake_kernel: Arc<FakeKernel>) {
    let container = Arc::new(Container::open(fake_kernel.clone()).unwrap());
    let mut group = Group::open(fake_kernel.clone(), GROUP).unwrap();
    group.unbind().unwrap();
    assert!(fake_kernel.ops().is_empty());

    group.bind(container).unwrap();
    group.unbind().unwrap();
    assert!(group.container().is_none());
    assert!(!group.status().unwrap().container_set());
}

#[rstest]
fn test_unbind_on_drop(fake_kernel: Arc<FakeKernel>) {
    let container = Arc::new(Container::open(fake_kernel.clone()).unwrap());
    let mut group = Group::open(fake_kernel.clone(), GROUP).unwrap();
    group.bind(container.clone()).unwrap();
    assert!(fake_kernel.is_bound(GROUP));
    drop(group);
    assert!(!fake_kernel.is_bound(GROUP));
    assert_eq!(Arc::strong_count(&container), 1);
}

#[rstest]
fn test_open_invalid_path(fake_kernel: Arc<FakeKernel>) {
    let ret = Group::open_path(fake_kernel.clone(), "/dev/vfio/vfio");
    assert_matches!(ret, Err(Error::InvalidGroupPath { .. }));
    assert!(fake_kernel.opened().is_empty());
}

#[rstest]
fn test_open_missing(fake_kernel: Arc<FakeKernel>) {
    let err = Group::open(fake_kernel, 7).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    assert_matches!(err, Error::OpenFailed { .. });
}
