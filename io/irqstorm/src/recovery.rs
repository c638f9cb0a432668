// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Power-cycle recovery of the target device.

use crate::{
    config::MonitorConfig,
    error::{Error, PmOp, Result},
    locator::locate,
    platform::{BusKind, DeviceRegistry, DeviceType},
};

/// Suspends and then resumes the configured device.
///
/// A failed suspend skips the resume. The device reference is released on
/// every path.
pub fn power_cycle<R: DeviceRegistry + ?Sized>(registry: &R, config: &MonitorConfig) -> Result<()> {
    let dev = locate(
        registry,
        BusKind::I2c,
        &config.adapter_name,
        &config.device_name,
        DeviceType::I2cClient,
    )?;
    let ops = registry.power_ops(dev.raw()).ok_or(Error::PmUnsupported)?;

    // Runtime suspend powers the device off; resume powers it back on.
    ops.suspend(dev.raw()).map_err(|errno| Error::PmFailure {
        op: PmOp::Suspend,
        errno,
    })?;
    ops.resume(dev.raw()).map_err(|errno| Error::PmFailure {
        op: PmOp::Resume,
        errno,
    })?;
    Ok(())
}

/// Runs [`power_cycle`] and logs the outcome. Never fails; the next storm
/// will try again.
pub fn recover<R: DeviceRegistry + ?Sized>(registry: &R, config: &MonitorConfig) {
    match power_cycle(registry, config) {
        Ok(()) => info!("power-cycled {}", config.device_name),
        Err(err @ (Error::NotFound | Error::WrongType)) => {
            error!("failed to reset {}: {err}", config.device_name)
        }
        Err(err) => error!("{}: {err}", config.device_name),
    }
}
