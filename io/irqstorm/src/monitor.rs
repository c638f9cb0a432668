// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Storm detection and the monitor lifecycle.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::{
    config::MonitorConfig,
    counter::read_total,
    error::{Error, Result},
    locator::find_device,
    platform::{BusKind, IrqId, Platform},
    recovery::recover,
    timer::RearmTimer,
    work::{DeferredWork, WorkHandle},
};

/// Outcome of one sampling period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The counter could not be read; nothing was evaluated.
    Skipped(Error),
    /// The delta stayed at or below the threshold.
    Quiet {
        /// Interrupts since the previous sample.
        delta: u64,
    },
    /// The delta exceeded the threshold.
    Storm {
        /// Interrupts since the previous sample.
        delta: u64,
    },
}

/// Per-period delta computation against a fixed threshold.
///
/// Owned by the sampling callback alone; nothing else touches
/// `previous_count`.
#[derive(Debug)]
pub struct StormDetector {
    threshold: u64,
    previous_count: u64,
}

impl StormDetector {
    /// Creates a detector primed with a first counter reading.
    pub const fn new(threshold: u64, primed: u64) -> Self {
        Self {
            threshold,
            previous_count: primed,
        }
    }

    /// Returns the last successfully read total.
    pub const fn previous_count(&self) -> u64 {
        self.previous_count
    }

    /// Feeds one sample.
    ///
    /// A failed read leaves the baseline untouched, so the next good read
    /// covers the skipped interval too. A counter that went backwards yields
    /// a zero delta.
    pub fn observe(&mut self, sample: Result<u64>) -> Verdict {
        let total = match sample {
            Ok(total) => total,
            Err(err) => return Verdict::Skipped(err),
        };
        let delta = total.saturating_sub(self.previous_count);
        self.previous_count = total;
        if delta > self.threshold {
            Verdict::Storm { delta }
        } else {
            Verdict::Quiet { delta }
        }
    }
}

#[derive(Default)]
struct Counters {
    samples: AtomicU64,
    failed_samples: AtomicU64,
    storms: AtomicU64,
    previous_count: AtomicU64,
}

/// A point-in-time view of a running [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    /// The watched interrupt line.
    pub irq: IrqId,
    /// Periods in which the counter was read successfully.
    pub samples: u64,
    /// Periods skipped because the counter could not be read.
    pub failed_samples: u64,
    /// Periods whose delta exceeded the threshold.
    pub storms: u64,
    /// Recoveries that armed an idle work slot.
    pub recoveries_dispatched: u64,
    /// Storm triggers folded into an outstanding recovery.
    pub recoveries_coalesced: u64,
    /// Recoveries that ran to completion, successful or not.
    pub recoveries_completed: u64,
    /// Baseline the next delta is computed against.
    pub previous_count: u64,
}

/// The storm watchdog.
///
/// Constructing one resolves the interrupt line, primes the baseline and arms
/// the sampling timer. Dropping it (or calling [`Monitor::shutdown`]) stops
/// the timer and waits for a running recovery to finish.
pub struct Monitor {
    irq: IrqId,
    counters: Arc<Counters>,
    work_handle: WorkHandle,
    // Teardown order matters: the timer goes before the work it schedules.
    timer: Option<RearmTimer>,
    work: Option<DeferredWork>,
}

impl Monitor {
    /// Starts watching the line described by `config`.
    ///
    /// Fails without leaving a timer or worker behind if the interrupt line
    /// cannot be resolved or its counter cannot be read.
    pub fn start(config: MonitorConfig, platform: Arc<dyn Platform>) -> Result<Self> {
        config.validate()?;

        let irq = {
            let dev = find_device(&*platform, BusKind::Platform, &config.bus_name)?;
            platform
                .resolve_irq_of(dev.raw(), config.irq_index)
                .ok_or_else(|| {
                    error!(
                        "{} has no interrupt line {}",
                        config.bus_name, config.irq_index
                    );
                    Error::NotFound
                })?
        };

        let primed = read_total(&*platform, irq).inspect_err(|err| {
            error!("bad interrupt {irq}: {err}");
        })?;

        let config = Arc::new(config);
        let counters = Arc::new(Counters::default());
        counters.previous_count.store(primed, Ordering::Relaxed);

        let work = {
            let platform = platform.clone();
            let config = config.clone();
            DeferredWork::spawn("irqstorm-recovery", move || recover(&*platform, &config))?
        };
        let work_handle = work.handle();

        let timer = {
            let mut detector = StormDetector::new(config.threshold, primed);
            let counters = counters.clone();
            let work_handle = work_handle.clone();
            let config = config.clone();
            RearmTimer::start("irqstorm-timer", config.period, move || {
                sample(&*platform, irq, &config, &mut detector, &counters, &work_handle)
            })?
        };

        info!(
            "watching IRQ {irq} of {}: threshold {} per {:?}, recovering {}/{}",
            config.bus_name, config.threshold, config.period, config.adapter_name,
            config.device_name
        );
        Ok(Self {
            irq,
            counters,
            work_handle,
            timer: Some(timer),
            work: Some(work),
        })
    }

    /// Returns the watched interrupt line.
    pub fn irq(&self) -> IrqId {
        self.irq
    }

    /// Returns the current counters.
    pub fn stats(&self) -> MonitorStats {
        let work = self.work_handle.stats();
        MonitorStats {
            irq: self.irq,
            samples: self.counters.samples.load(Ordering::Relaxed),
            failed_samples: self.counters.failed_samples.load(Ordering::Relaxed),
            storms: self.counters.storms.load(Ordering::Relaxed),
            recoveries_dispatched: work.queued,
            recoveries_coalesced: work.coalesced,
            recoveries_completed: work.completed,
            previous_count: self.counters.previous_count.load(Ordering::Relaxed),
        }
    }

    /// Stops sampling and waits for an in-flight recovery to finish.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.delete_sync();
        }
        if let Some(work) = self.work.take() {
            if work.cancel_sync() {
                debug!("waited for outstanding recovery");
            }
            drop(work);
            info!("stopped watching IRQ {}", self.irq);
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// One timer period: read, evaluate, maybe dispatch recovery.
fn sample(
    platform: &dyn Platform,
    irq: IrqId,
    config: &MonitorConfig,
    detector: &mut StormDetector,
    counters: &Counters,
    work: &WorkHandle,
) {
    match detector.observe(read_total(platform, irq)) {
        Verdict::Skipped(err) => {
            counters.failed_samples.fetch_add(1, Ordering::Relaxed);
            error!("bad interrupt {irq}: {err}");
        }
        Verdict::Quiet { delta } => {
            counters.samples.fetch_add(1, Ordering::Relaxed);
            trace!("IRQ {irq}: {delta} interrupts this period");
        }
        Verdict::Storm { delta } => {
            counters.samples.fetch_add(1, Ordering::Relaxed);
            counters.storms.fetch_add(1, Ordering::Relaxed);
            info!(
                "{delta} > {}, resetting {}",
                config.threshold, config.device_name
            );
            work.reschedule();
        }
    }
    counters
        .previous_count
        .store(detector.previous_count(), Ordering::Relaxed);
}
