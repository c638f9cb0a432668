// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Linux host platform backed by sysfs and `/proc/interrupts`.
//!
//! Devices are looked up under `<sys>/bus/<bus>/devices`. Interrupt lines and
//! their per-CPU counts come from `/proc/interrupts`, which lists one column
//! per online CPU. A power cycle is a driver unbind followed by a bind, which
//! runs the driver's remove and bind paths and with them the device's
//! power-down and power-up sequence.

use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use slab::Slab;
use spin::Mutex;

use crate::platform::{
    BusKind, DeviceRegistry, DeviceType, IrqId, IrqStats, PowerOps, RawDevice,
};

const EIO: i32 = 5;

#[derive(Clone)]
struct Node {
    path: PathBuf,
    bus: BusKind,
}

/// One numbered line of `/proc/interrupts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptLine {
    /// Line number.
    pub irq: u32,
    /// Service counts, one per online CPU.
    pub counts: Vec<u64>,
    /// Chip, hardware IRQ and action names, in order.
    pub labels: Vec<String>,
}

impl InterruptLine {
    /// Returns `true` if `name` is one of the line's labels.
    pub fn names(&self, name: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.trim_end_matches(',') == name)
    }
}

/// Parses `/proc/interrupts`. Architecture lines (`NMI`, `LOC`, ...) are
/// skipped.
pub fn parse_interrupts(text: &str) -> Vec<InterruptLine> {
    let mut lines = text.lines();
    let cpus = match lines.next() {
        Some(header) => header
            .split_whitespace()
            .filter(|col| col.starts_with("CPU"))
            .count(),
        None => return Vec::new(),
    };

    lines
        .filter_map(|line| {
            let (label, rest) = line.split_once(':')?;
            let irq = label.trim().parse().ok()?;
            let mut fields = rest.split_whitespace().peekable();
            let mut counts = Vec::with_capacity(cpus);
            while counts.len() < cpus {
                match fields.peek().and_then(|f| f.parse::<u64>().ok()) {
                    Some(n) => {
                        counts.push(n);
                        fields.next();
                    }
                    None => break,
                }
            }
            Some(InterruptLine {
                irq,
                counts,
                labels: fields.map(str::to_owned).collect(),
            })
        })
        .collect()
}

/// [`Platform`](crate::Platform) implementation for a Linux host.
pub struct SysfsPlatform {
    sys_root: PathBuf,
    interrupts: PathBuf,
    handles: Mutex<Slab<Node>>,
    /// Devices we unbound, mapped to the driver to bind them back to.
    unbound: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl SysfsPlatform {
    /// Uses `/sys` and `/proc/interrupts`.
    pub fn new() -> Self {
        Self::with_roots("/sys", "/proc/interrupts")
    }

    /// Uses an alternate sysfs mount and interrupts file.
    pub fn with_roots(sys_root: impl Into<PathBuf>, interrupts: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
            interrupts: interrupts.into(),
            handles: Mutex::new(Slab::new()),
            unbound: Mutex::new(HashMap::new()),
        }
    }

    /// Number of device references currently held.
    pub fn outstanding(&self) -> usize {
        self.handles.lock().len()
    }

    fn read_interrupts(&self) -> Option<Vec<InterruptLine>> {
        match fs::read_to_string(&self.interrupts) {
            Ok(text) => Some(parse_interrupts(&text)),
            Err(e) => {
                debug!("failed to read {}: {e}", self.interrupts.display());
                None
            }
        }
    }

    fn take(&self, node: Node) -> RawDevice {
        RawDevice::from_raw(self.handles.lock().insert(node) as u64)
    }

    fn node(&self, dev: &RawDevice) -> Option<Node> {
        self.handles.lock().get(dev.as_raw() as usize).cloned()
    }

    fn driver_of(&self, path: &Path) -> Option<PathBuf> {
        fs::canonicalize(path.join("driver"))
            .ok()
            .or_else(|| self.unbound.lock().get(path).cloned())
    }
}

impl Default for SysfsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn bus_dir(bus: BusKind) -> &'static str {
    match bus {
        BusKind::Platform => "platform",
        BusKind::I2c => "i2c",
    }
}

fn device_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn write_attr(path: &Path, value: &str) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .open(path)?
        .write_all(value.as_bytes())
}

fn errno(e: &io::Error) -> i32 {
    -e.raw_os_error().unwrap_or(EIO)
}

impl DeviceRegistry for SysfsPlatform {
    fn find_device_by_name(&self, bus: BusKind, name: &str) -> Option<RawDevice> {
        let path = self
            .sys_root
            .join("bus")
            .join(bus_dir(bus))
            .join("devices")
            .join(name);
        path.exists().then(|| self.take(Node { path, bus }))
    }

    fn find_child_by_name(&self, parent: &RawDevice, name: &str) -> Option<RawDevice> {
        let parent = self.node(parent)?;
        let path = parent.path.join(name);
        path.is_dir().then(|| {
            self.take(Node {
                path,
                bus: parent.bus,
            })
        })
    }

    fn device_type(&self, dev: &RawDevice) -> DeviceType {
        let Some(node) = self.node(dev) else {
            return DeviceType::Other;
        };
        let devtype = fs::read_to_string(node.path.join("uevent"))
            .ok()
            .and_then(|uevent| {
                uevent
                    .lines()
                    .find_map(|l| l.strip_prefix("DEVTYPE="))
                    .map(str::to_owned)
            });
        match (devtype.as_deref(), node.bus) {
            (Some("i2c_client"), _) => DeviceType::I2cClient,
            (Some("i2c_adapter"), _) => DeviceType::I2cAdapter,
            (None, BusKind::Platform) => DeviceType::Platform,
            // I2C device types carry no name, so the kernel emits no DEVTYPE.
            // Adapters expose new_device/delete_device, clients a modalias.
            (None, BusKind::I2c) if node.path.join("new_device").exists() => {
                DeviceType::I2cAdapter
            }
            (None, BusKind::I2c) if node.path.join("modalias").exists() => DeviceType::I2cClient,
            _ => DeviceType::Other,
        }
    }

    fn resolve_irq_of(&self, dev: &RawDevice, index: usize) -> Option<IrqId> {
        let node = self.node(dev)?;
        let name = device_name(&node.path)?;
        self.read_interrupts()?
            .into_iter()
            .filter(|line| line.names(name))
            .nth(index)
            .map(|line| IrqId(line.irq))
    }

    fn power_ops(&self, dev: &RawDevice) -> Option<&dyn PowerOps> {
        let node = self.node(dev)?;
        self.driver_of(&node.path)?;
        Some(self)
    }

    fn release(&self, dev: RawDevice) {
        if self
            .handles
            .lock()
            .try_remove(dev.as_raw() as usize)
            .is_none()
        {
            warn!("release of unknown device handle {}", dev.as_raw());
        }
    }
}

impl PowerOps for SysfsPlatform {
    fn suspend(&self, dev: &RawDevice) -> Result<(), i32> {
        let node = self.node(dev).ok_or(-EIO)?;
        let name = device_name(&node.path).ok_or(-EIO)?;
        let Ok(driver) = fs::canonicalize(node.path.join("driver")) else {
            // Left unbound by an earlier failed resume.
            return if self.unbound.lock().contains_key(&node.path) {
                Ok(())
            } else {
                Err(-EIO)
            };
        };
        write_attr(&driver.join("unbind"), name).map_err(|e| errno(&e))?;
        debug!("unbound {name} from {}", driver.display());
        self.unbound.lock().insert(node.path, driver);
        Ok(())
    }

    fn resume(&self, dev: &RawDevice) -> Result<(), i32> {
        let node = self.node(dev).ok_or(-EIO)?;
        let name = device_name(&node.path).ok_or(-EIO)?;
        let driver = self.unbound.lock().get(&node.path).cloned().ok_or(-EIO)?;
        write_attr(&driver.join("bind"), name).map_err(|e| errno(&e))?;
        debug!("bound {name} to {}", driver.display());
        self.unbound.lock().remove(&node.path);
        Ok(())
    }
}

impl IrqStats for SysfsPlatform {
    fn kstat_irqs(&self, irq: IrqId) -> Option<Vec<u64>> {
        self.read_interrupts()?
            .into_iter()
            .find(|line| line.irq == irq.0)
            .map(|line| line.counts)
    }
}
