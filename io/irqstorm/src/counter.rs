// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Interrupt counter reader.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{
    error::{Error, Result},
    platform::{IrqId, IrqStats},
};

static CORRUPT_WARNED: AtomicBool = AtomicBool::new(false);

/// Returns the number of interrupts serviced on `irq` across all online CPUs.
///
/// Fails with [`Error::NotFound`] if the line is not registered, including
/// when its descriptor vanishes mid-read, and with [`Error::Invalid`] if the
/// sum does not fit the signed counter range.
pub fn read_total<S: IrqStats + ?Sized>(stats: &S, irq: IrqId) -> Result<u64> {
    let counts = stats.kstat_irqs(irq).ok_or(Error::NotFound)?;
    let total = counts
        .iter()
        .try_fold(0u64, |acc, &n| acc.checked_add(n))
        .filter(|&total| i64::try_from(total).is_ok());

    match total {
        Some(total) => Ok(total),
        None => {
            if !CORRUPT_WARNED.swap(true, Ordering::Relaxed) {
                warn!("IRQ {irq}: per-CPU counts {counts:?} overflow the counter range");
            }
            Err(Error::Invalid)
        }
    }
}
