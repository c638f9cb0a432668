// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Monitor configuration.
//!
//! Defaults are generated at build time from `configs/zenbook.toml`, or from
//! the file named by `IRQSTORM_CONFIG_PATH`.

use core::time::Duration;

use crate::error::{Error, Result};

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// Identity of the watched line and the device to recover, plus the storm
/// threshold. Fixed for the lifetime of a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Name of the platform device that owns the interrupt line.
    pub bus_name: String,
    /// Index of the interrupt line on `bus_name`.
    pub irq_index: usize,
    /// Name of the communication-bus adapter the target device sits on.
    pub adapter_name: String,
    /// Name of the device to power-cycle.
    pub device_name: String,
    /// Interrupt-count delta per period above which recovery is triggered.
    pub threshold: u64,
    /// Sampling period.
    pub period: Duration,
}

impl MonitorConfig {
    /// Checks that every name is set and the period is non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.bus_name.is_empty() || self.adapter_name.is_empty() || self.device_name.is_empty()
        {
            return Err(Error::Invalid);
        }
        if self.period.is_zero() {
            return Err(Error::Invalid);
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bus_name: BUS_NAME.into(),
            irq_index: IRQ_INDEX,
            adapter_name: ADAPTER_NAME.into(),
            device_name: DEVICE_NAME.into(),
            threshold: THRESHOLD,
            period: Duration::from_millis(PERIOD_MS),
        }
    }
}
