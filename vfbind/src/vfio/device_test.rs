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

use std::sync::Arc;

use assert_matches::assert_matches;
use rstest::rstest;
use zerocopy::IntoBytes;

use crate::sys::vfio::{VfioDeviceInfo, VfioDeviceInfoFlag, VfioOp};
use crate::vfio::device::{Device, DeviceInfo, encode_label};
use crate::vfio::group::Group;
use crate::vfio::tests::{
    CallArg, DEVICE, FakeKernel, GROUP, bound_group, fake_kernel, pci_device_info,
};
use crate::vfio::{Error, Target};

#[test]
fn test_encode_label() {
    let buf = encode_label(DEVICE);
    assert_eq!(buf.len(), 13);
    assert_eq!(&buf[..12], DEVICE.as_bytes());
    assert_eq!(buf[12], 0);

    assert_eq!(encode_label(""), [0]);
    assert_eq!(encode_label("ab\0"), [b'a', b'b', 0, 0]);
}

#[rstest]
fn test_resolve_unbound(fake_kernel: Arc<FakeKernel>) {
    let group = Arc::new(Group::open(fake_kernel.clone(), GROUP).unwrap());
    assert_matches!(
        Device::resolve(group, DEVICE),
        Err(Error::PreconditionViolated {
            op: VfioOp::GroupGetDeviceFd,
            target: Target::Group(GROUP),
            ..
        })
    );
    assert!(fake_kernel.calls().is_empty());
}

#[rstest]
fn test_resolve(fake_kernel: Arc<FakeKernel>) {
    let group = bound_group(&fake_kernel);
    let device = Device::resolve(group.clone(), DEVICE).unwrap();
    assert_eq!(device.label(), DEVICE);
    assert!(Arc::ptr_eq(device.group(), &group));

    let calls = fake_kernel.calls();
    let resolve = calls.last().unwrap();
    assert_eq!(resolve.op, VfioOp::GroupGetDeviceFd);
    assert_eq!(resolve.arg, CallArg::Buf(encode_label(DEVICE)));
}

#[rstest]
#[case("")]
#[case("0000:02:00.0")]
fn test_resolve_rejected(fake_kernel: Arc<FakeKernel>, #[case] label: &str) {
    let group = bound_group(&fake_kernel);
    let err = Device::resolve(group, label).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENODEV));
    assert_matches!(
        err,
        Error::IoctlFailed {
            op: VfioOp::GroupGetDeviceFd,
            ..
        }
    );
}

#[rstest]
fn test_info(fake_kernel: Arc<FakeKernel>) {
    let device = Device::resolve(bound_group(&fake_kernel), DEVICE).unwrap();
    let info = device.info().unwrap();
    assert_eq!(
        info,
        DeviceInfo {
            flags: VfioDeviceInfoFlag::PCI,
            num_regions: 7,
            num_irqs: 2,
        }
    );
    let request = VfioDeviceInfo {
        argsz: 16,
        ..Default::default()
    };
    let calls = fake_kernel.calls();
    assert_eq!(calls.last().unwrap().op, VfioOp::DeviceGetInfo);
    assert_eq!(
        calls.last().unwrap().arg,
        CallArg::Buf(request.as_bytes().to_vec())
    );
}

#[rstest]
fn test_info_failed(fake_kernel: Arc<FakeKernel>) {
    let device = Device::resolve(bound_group(&fake_kernel), DEVICE).unwrap();
    fake_kernel.fail(VfioOp::DeviceGetInfo, libc::EFAULT);
    assert_matches!(
        device.info(),
        Err(Error::IoctlFailed { target: Target::Device(label), .. }) if label == DEVICE
    );
}

#[rstest]
fn test_reset_unsupported(fake_kernel: Arc<FakeKernel>) {
    let device = Device::resolve(bound_group(&fake_kernel), DEVICE).unwrap();
    assert_matches!(
        device.reset(),
        Err(Error::PreconditionViolated {
            op: VfioOp::DeviceReset,
            ..
        })
    );
    assert!(!fake_kernel.ops().contains(&VfioOp::DeviceReset));
}

#[test]
fn test_reset() {
    let flags = VfioDeviceInfoFlag::PCI | VfioDeviceInfoFlag::RESET;
    let kernel = FakeKernel::new()
        .with_group(GROUP, true)
        .with_device(DEVICE, pci_device_info(flags));
    let kernel = Arc::new(kernel);
    let device = Device::resolve(bound_group(&kernel), DEVICE).unwrap();
    device.reset().unwrap();
    assert_eq!(kernel.ops().last(), Some(&VfioOp::DeviceReset));
}

#[rstest]
fn test_device_keeps_group_bound(fake_kernel: Arc<FakeKernel>) {
    let device = Device::resolve(bound_group(&fake_kernel), DEVICE).unwrap();
    assert!(fake_kernel.is_bound(GROUP));
    assert!(device.container().is_some());
    drop(device);
    assert!(!fake_kernel.is_bound(GROUP));
}
