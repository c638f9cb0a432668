// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Interrupt storm watchdog.
//!
//! Samples the cumulative interrupt count of one IRQ line every period and,
//! when the per-period delta exceeds a threshold, power-cycles the device
//! behind it on a dedicated worker. Triggers that arrive while a recovery is
//! still pending are folded into it.
//!
//! The host is reached only through the traits in [`platform`]; the `sysfs`
//! feature provides a Linux implementation.

#[macro_use]
extern crate log;
extern crate alloc;

pub mod config;
pub mod counter;
pub mod error;
pub mod locator;
pub mod monitor;
pub mod platform;
pub mod recovery;
pub mod timer;
pub mod work;

#[cfg(test)]
mod fake;

cfg_if::cfg_if! {
    if #[cfg(feature = "sysfs")] {
        pub mod sysfs;
        pub use crate::sysfs::SysfsPlatform;
    }
}

pub use crate::{
    config::MonitorConfig,
    error::{Error, PmOp, Result},
    monitor::{Monitor, MonitorStats, StormDetector, Verdict},
    platform::{
        BusKind, DeviceRef, DeviceRegistry, DeviceType, IrqId, IrqStats, Platform, PowerOps,
        RawDevice,
    },
};
