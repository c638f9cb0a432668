// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Platform services consumed by the watchdog.
//!
//! Device lookup, interrupt introspection and power management are provided
//! by the host. The watchdog only talks to them through the traits in this
//! module, so tests can substitute a fake.

use core::fmt;

/// A hardware interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrqId(pub u32);

impl fmt::Display for IrqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bus class a top-level device is looked up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    /// Platform bus; interrupt-owning controllers live here.
    Platform,
    /// I2C bus; adapters and their clients live here.
    I2c,
}

/// Device class of a located device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Client device on an I2C adapter.
    I2cClient,
    /// I2C adapter.
    I2cAdapter,
    /// Platform device.
    Platform,
    /// Anything else.
    Other,
}

/// A counted reference to a device object, issued by a [`DeviceRegistry`].
///
/// Not `Clone`: every reference handed out must go back through
/// [`DeviceRegistry::release`] exactly once. Use [`DeviceRef`] to get that
/// for free.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RawDevice(u64);

impl RawDevice {
    /// Wraps a registry-specific token.
    ///
    /// For [`DeviceRegistry`] implementations only: call it once per
    /// reference taken, when handing that reference out. Wrapping a token
    /// anywhere else mints a second handle for the same reference and breaks
    /// the release-once accounting.
    pub const fn from_raw(token: u64) -> Self {
        Self(token)
    }

    /// Returns the registry-specific token.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Power-management callbacks of a device.
pub trait PowerOps {
    /// Idle-suspends `dev`. Returns the errno on failure.
    fn suspend(&self, dev: &RawDevice) -> Result<(), i32>;
    /// Resumes `dev`. Returns the errno on failure.
    fn resume(&self, dev: &RawDevice) -> Result<(), i32>;
}

/// Device lookup and lifetime management.
pub trait DeviceRegistry: Send + Sync {
    /// Finds a device named `name` on `bus`, taking a reference to it.
    fn find_device_by_name(&self, bus: BusKind, name: &str) -> Option<RawDevice>;
    /// Finds the immediate child of `parent` named `name`, taking a reference
    /// to it. The parent reference is left untouched.
    fn find_child_by_name(&self, parent: &RawDevice, name: &str) -> Option<RawDevice>;
    /// Returns the device class of `dev`.
    fn device_type(&self, dev: &RawDevice) -> DeviceType;
    /// Resolves the `index`-th interrupt line of a platform device.
    fn resolve_irq_of(&self, dev: &RawDevice, index: usize) -> Option<IrqId>;
    /// Returns the power-management callbacks of `dev`, if it has any.
    fn power_ops(&self, dev: &RawDevice) -> Option<&dyn PowerOps>;
    /// Drops a reference taken by one of the lookups.
    fn release(&self, dev: RawDevice);
}

/// Interrupt accounting.
pub trait IrqStats: Send + Sync {
    /// Returns the service counts of `irq` on every online CPU.
    ///
    /// The counts must be read under a discipline that tolerates the
    /// descriptor being torn down concurrently: if it disappears at any
    /// point during the read, return `None` rather than partial data.
    fn kstat_irqs(&self, irq: IrqId) -> Option<Vec<u64>>;
}

/// Everything the watchdog needs from its host.
pub trait Platform: DeviceRegistry + IrqStats {}

impl<T: DeviceRegistry + IrqStats> Platform for T {}

/// A [`RawDevice`] that is released when dropped.
pub struct DeviceRef<'a, R: DeviceRegistry + ?Sized> {
    registry: &'a R,
    raw: RawDevice,
}

impl<'a, R: DeviceRegistry + ?Sized> DeviceRef<'a, R> {
    /// Takes ownership of `raw`, which must have been issued by `registry`.
    pub fn new(registry: &'a R, raw: RawDevice) -> Self {
        Self { registry, raw }
    }

    /// Returns the underlying reference without giving it up.
    pub fn raw(&self) -> &RawDevice {
        &self.raw
    }

    /// Returns the device class.
    pub fn device_type(&self) -> DeviceType {
        self.registry.device_type(&self.raw)
    }

    /// Trades this reference for one to the child named `name`.
    ///
    /// The parent is released whether or not the child exists.
    pub fn into_child(self, name: &str) -> Option<DeviceRef<'a, R>> {
        let registry = self.registry;
        registry
            .find_child_by_name(&self.raw, name)
            .map(|raw| DeviceRef::new(registry, raw))
    }
}

impl<R: DeviceRegistry + ?Sized> Drop for DeviceRef<'_, R> {
    fn drop(&mut self) {
        // Hands back the token this guard was given; `self.raw` dies with it.
        self.registry
            .release(RawDevice::from_raw(self.raw.as_raw()));
    }
}

impl<R: DeviceRegistry + ?Sized> fmt::Debug for DeviceRef<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeviceRef").field(&self.raw).finish()
    }
}
