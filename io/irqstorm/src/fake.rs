// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! In-memory platform for unit tests.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use spin::Mutex;

use crate::platform::{
    BusKind, DeviceRegistry, DeviceType, IrqId, IrqStats, PowerOps, RawDevice,
};

struct Node {
    name: &'static str,
    bus: Option<BusKind>,
    parent: Option<usize>,
    ty: DeviceType,
    irqs: &'static [IrqId],
}

/// A three-node device tree: the interrupt-owning controller on the platform
/// bus, the I2C adapter and the touchpad client below it.
pub struct FakeBus {
    nodes: Vec<Node>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    pm: AtomicBool,
    suspend_result: Mutex<Result<(), i32>>,
    resume_result: Mutex<Result<(), i32>>,
    pm_calls: Mutex<Vec<&'static str>>,
    kstat: Mutex<Option<Vec<u64>>>,
}

impl FakeBus {
    pub const CONTROLLER: &'static str = "AMDI0010:01";
    pub const ADAPTER: &'static str = "i2c-1";
    pub const DEVICE: &'static str = "i2c-ASUE140D:00";
    pub const IRQ: IrqId = IrqId(27);

    pub fn zenbook() -> Self {
        let nodes = vec![
            Node {
                name: Self::CONTROLLER,
                bus: Some(BusKind::Platform),
                parent: None,
                ty: DeviceType::Platform,
                irqs: &[Self::IRQ],
            },
            Node {
                name: Self::ADAPTER,
                bus: Some(BusKind::I2c),
                parent: None,
                ty: DeviceType::I2cAdapter,
                irqs: &[],
            },
            Node {
                name: Self::DEVICE,
                bus: None,
                parent: Some(1),
                ty: DeviceType::I2cClient,
                irqs: &[],
            },
        ];
        Self {
            nodes,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            pm: AtomicBool::new(true),
            suspend_result: Mutex::new(Ok(())),
            resume_result: Mutex::new(Ok(())),
            pm_calls: Mutex::new(Vec::new()),
            kstat: Mutex::new(Some(vec![0])),
        }
    }

    pub fn set_kstat(&self, counts: Option<Vec<u64>>) {
        *self.kstat.lock() = counts;
    }

    pub fn set_pm(&self, enabled: bool) {
        self.pm.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_suspend(&self, errno: i32) {
        *self.suspend_result.lock() = Err(errno);
    }

    pub fn fail_resume(&self, errno: i32) {
        *self.resume_result.lock() = Err(errno);
    }

    pub fn pm_calls(&self) -> Vec<&'static str> {
        self.pm_calls.lock().clone()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.gets() - self.puts.load(Ordering::SeqCst)
    }

    fn take(&self, index: usize) -> RawDevice {
        self.gets.fetch_add(1, Ordering::SeqCst);
        RawDevice::from_raw(index as u64)
    }

    fn node(&self, dev: &RawDevice) -> &Node {
        &self.nodes[dev.as_raw() as usize]
    }
}

impl DeviceRegistry for FakeBus {
    fn find_device_by_name(&self, bus: BusKind, name: &str) -> Option<RawDevice> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.bus == Some(bus) && n.name == name)?;
        Some(self.take(index))
    }

    fn find_child_by_name(&self, parent: &RawDevice, name: &str) -> Option<RawDevice> {
        let parent = parent.as_raw() as usize;
        let index = self
            .nodes
            .iter()
            .position(|n| n.parent == Some(parent) && n.name == name)?;
        Some(self.take(index))
    }

    fn device_type(&self, dev: &RawDevice) -> DeviceType {
        self.node(dev).ty
    }

    fn resolve_irq_of(&self, dev: &RawDevice, index: usize) -> Option<IrqId> {
        self.node(dev).irqs.get(index).copied()
    }

    fn power_ops(&self, _dev: &RawDevice) -> Option<&dyn PowerOps> {
        if self.pm.load(Ordering::SeqCst) {
            Some(self)
        } else {
            None
        }
    }

    fn release(&self, _dev: RawDevice) {
        self.puts.fetch_add(1, Ordering::SeqCst);
    }
}

impl PowerOps for FakeBus {
    fn suspend(&self, _dev: &RawDevice) -> Result<(), i32> {
        self.pm_calls.lock().push("suspend");
        *self.suspend_result.lock()
    }

    fn resume(&self, _dev: &RawDevice) -> Result<(), i32> {
        self.pm_calls.lock().push("resume");
        *self.resume_result.lock()
    }
}

impl IrqStats for FakeBus {
    fn kstat_irqs(&self, irq: IrqId) -> Option<Vec<u64>> {
        if irq != Self::IRQ {
            return None;
        }
        self.kstat.lock().clone()
    }
}
