// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Watchdog daemon: watches the configured interrupt line until asked to
//! terminate, then shuts the monitor down so no recovery is cut off midway.

use std::{process::ExitCode, sync::Arc};

use irqstorm::{Monitor, MonitorConfig, SysfsPlatform, config::LOG_LEVEL};
use log::{error, info};
use signal_hook::{consts::TERM_SIGNALS, iterator::Signals};

/// Blocks until one of the registered signals arrives.
fn wait_for_signal(signals: &mut Signals) -> Option<i32> {
    signals.forever().next()
}

fn main() -> ExitCode {
    if let Err(e) = klogger::init_klogger() {
        eprintln!("irqstormd: failed to install logger: {e}");
        return ExitCode::FAILURE;
    }
    klogger::set_log_level(LOG_LEVEL);

    // Registered before the monitor starts, so an early SIGTERM still goes
    // through the orderly shutdown below.
    let mut signals = match Signals::new(TERM_SIGNALS) {
        Ok(signals) => signals,
        Err(e) => {
            error!("failed to register signal handlers: {e}");
            return ExitCode::FAILURE;
        }
    };

    let monitor = match Monitor::start(MonitorConfig::default(), Arc::new(SysfsPlatform::new())) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    match wait_for_signal(&mut signals) {
        Some(sig) => info!("caught signal {sig}, shutting down"),
        None => error!("signal iterator closed, shutting down"),
    }
    monitor.shutdown();
    ExitCode::SUCCESS
}
