//! Scripted platform shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use irqstorm::{
    BusKind, DeviceRegistry, DeviceType, IrqId, IrqStats, MonitorConfig, PowerOps, RawDevice,
};
use spin::Mutex;

pub const CONTROLLER: &str = "AMDI0010:01";
pub const ADAPTER: &str = "i2c-1";
pub const DEVICE: &str = "i2c-ASUE140D:00";
pub const IRQ: IrqId = IrqId(27);

const NODE_CONTROLLER: u64 = 0;
const NODE_ADAPTER: u64 = 1;
const NODE_DEVICE: u64 = 2;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config(threshold: u64) -> MonitorConfig {
    MonitorConfig {
        bus_name: CONTROLLER.into(),
        irq_index: 0,
        adapter_name: ADAPTER.into(),
        device_name: DEVICE.into(),
        threshold,
        period: Duration::from_millis(5),
    }
}

pub fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// A platform whose counter readings follow a script.
///
/// Each read consumes one entry; `None` entries fail the read. Once the
/// script runs out the last good value repeats.
pub struct ScriptedPlatform {
    script: Mutex<VecDeque<Option<u64>>>,
    last: Mutex<u64>,
    reads: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
    suspends: AtomicUsize,
    resumes: AtomicUsize,
    in_pm: AtomicUsize,
    max_in_pm: AtomicUsize,
    hold: AtomicBool,
}

impl ScriptedPlatform {
    pub fn new(script: impl IntoIterator<Item = Option<u64>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(0),
            reads: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            suspends: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            in_pm: AtomicUsize::new(0),
            max_in_pm: AtomicUsize::new(0),
            hold: AtomicBool::new(false),
        }
    }

    pub fn counts(values: &[u64]) -> Self {
        Self::new(values.iter().copied().map(Some))
    }

    /// Makes suspend block until [`release_hold`](Self::release_hold).
    pub fn hold_suspend(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release_hold(&self) {
        self.hold.store(false, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn suspends(&self) -> usize {
        self.suspends.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn in_pm(&self) -> usize {
        self.in_pm.load(Ordering::SeqCst)
    }

    pub fn max_in_pm(&self) -> usize {
        self.max_in_pm.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.gets() - self.puts.load(Ordering::SeqCst)
    }

    fn take(&self, node: u64) -> RawDevice {
        self.gets.fetch_add(1, Ordering::SeqCst);
        RawDevice::from_raw(node)
    }
}

impl DeviceRegistry for ScriptedPlatform {
    fn find_device_by_name(&self, bus: BusKind, name: &str) -> Option<RawDevice> {
        match (bus, name) {
            (BusKind::Platform, CONTROLLER) => Some(self.take(NODE_CONTROLLER)),
            (BusKind::I2c, ADAPTER) => Some(self.take(NODE_ADAPTER)),
            _ => None,
        }
    }

    fn find_child_by_name(&self, parent: &RawDevice, name: &str) -> Option<RawDevice> {
        (parent.as_raw() == NODE_ADAPTER && name == DEVICE).then(|| self.take(NODE_DEVICE))
    }

    fn device_type(&self, dev: &RawDevice) -> DeviceType {
        match dev.as_raw() {
            NODE_CONTROLLER => DeviceType::Platform,
            NODE_ADAPTER => DeviceType::I2cAdapter,
            _ => DeviceType::I2cClient,
        }
    }

    fn resolve_irq_of(&self, dev: &RawDevice, index: usize) -> Option<IrqId> {
        (dev.as_raw() == NODE_CONTROLLER && index == 0).then_some(IRQ)
    }

    fn power_ops(&self, dev: &RawDevice) -> Option<&dyn PowerOps> {
        (dev.as_raw() == NODE_DEVICE).then_some(self as &dyn PowerOps)
    }

    fn release(&self, _dev: RawDevice) {
        self.puts.fetch_add(1, Ordering::SeqCst);
    }
}

impl PowerOps for ScriptedPlatform {
    fn suspend(&self, _dev: &RawDevice) -> Result<(), i32> {
        let now = self.in_pm.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_pm.fetch_max(now, Ordering::SeqCst);
        self.suspends.fetch_add(1, Ordering::SeqCst);
        while self.hold.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn resume(&self, _dev: &RawDevice) -> Result<(), i32> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.in_pm.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

impl IrqStats for ScriptedPlatform {
    fn kstat_irqs(&self, irq: IrqId) -> Option<Vec<u64>> {
        if irq != IRQ {
            return None;
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        match self.script.lock().pop_front() {
            Some(Some(total)) => {
                *last = total;
                Some(vec![total])
            }
            Some(None) => None,
            None => Some(vec![*last]),
        }
    }
}
