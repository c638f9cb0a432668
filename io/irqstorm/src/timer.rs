// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Self re-arming one-shot timer.
//!
//! The callback runs on the timer's own thread, one firing at a time. The
//! next deadline is armed one period after the callback returns, so firings
//! never overlap and a slow callback delays the schedule instead of queueing
//! up late firings.

use alloc::sync::Arc;
use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use std::{
    thread::{self, JoinHandle},
    time::Instant,
};

use event_listener::{Event, Listener};

use crate::error::{Error, Result};

#[derive(Default)]
struct TimerShared {
    deleted: AtomicBool,
    wake: Event,
}

/// A periodic timer whose period restarts after every firing.
pub struct RearmTimer {
    shared: Arc<TimerShared>,
    thread: Option<JoinHandle<()>>,
}

impl RearmTimer {
    /// Arms a timer that first fires one `period` from now.
    pub fn start<F>(name: &str, period: Duration, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(TimerShared::default());
        let timer_shared = shared.clone();
        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || timer_loop(&timer_shared, period, callback))
            .map_err(|e| {
                error!("failed to spawn timer {name}: {e}");
                Error::Spawn
            })?;
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Returns `true` until the timer has been deleted.
    pub fn is_armed(&self) -> bool {
        self.thread.is_some()
    }

    /// Disarms the timer, waiting for an in-flight firing to complete.
    ///
    /// Once this returns the callback will not run again.
    pub fn delete_sync(&mut self) {
        self.shared.deleted.store(true, Ordering::SeqCst);
        self.shared.wake.notify(usize::MAX);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("timer thread panicked");
            }
        }
    }
}

impl Drop for RearmTimer {
    fn drop(&mut self) {
        self.delete_sync();
    }
}

fn timer_loop<F: FnMut()>(shared: &TimerShared, period: Duration, mut callback: F) {
    let mut deadline = Instant::now() + period;
    loop {
        if shared.deleted.load(Ordering::SeqCst) {
            return;
        }
        let listener = shared.wake.listen();
        if shared.deleted.load(Ordering::SeqCst) {
            return;
        }
        if listener.wait_deadline(deadline).is_some() {
            // Woken early; re-check for deletion, keep the deadline.
            continue;
        }
        if shared.deleted.load(Ordering::SeqCst) {
            return;
        }
        callback();
        deadline = Instant::now() + period;
    }
}
