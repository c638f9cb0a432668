// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Single-slot deferred work.
//!
//! A [`DeferredWork`] binds one reusable callback to a dedicated worker
//! thread. Scheduling only flips a pending flag, so any number of triggers
//! before the worker picks the item up collapse into one run, and the worker
//! never runs the callback twice at once.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use event_listener::{Event, Listener};
use spin::Mutex;

use crate::error::{Error, Result};

/// A callback that can be run any number of times.
#[derive(Clone)]
pub struct WorkFn(Arc<dyn Fn() + Send + Sync>);

impl WorkFn {
    /// Creates a new work function.
    pub fn new<F: Fn() + Send + Sync + 'static>(func: F) -> Self {
        Self(Arc::new(func))
    }

    /// Executes the work function.
    pub fn call(&self) {
        (self.0)()
    }
}

impl<T: Fn() + Send + Sync + 'static> From<T> for WorkFn {
    fn from(func: T) -> Self {
        Self::new(func)
    }
}

#[derive(Default)]
struct SlotState {
    pending: bool,
    running: bool,
    exiting: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    /// Notified whenever `state` changes.
    changed: Event,
    queued: AtomicU64,
    coalesced: AtomicU64,
    completed: AtomicU64,
}

impl Slot {
    fn update<T>(&self, f: impl FnOnce(&mut SlotState) -> T) -> T {
        let ret = f(&mut *self.state.lock());
        self.changed.notify(usize::MAX);
        ret
    }

    fn wait_until(&self, cond: impl Fn(&SlotState) -> bool) {
        loop {
            if cond(&*self.state.lock()) {
                return;
            }
            let listener = self.changed.listen();
            if cond(&*self.state.lock()) {
                return;
            }
            listener.wait();
        }
    }
}

/// Counters of a [`DeferredWork`] slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkStats {
    /// Schedules that armed an idle slot.
    pub queued: u64,
    /// Schedules absorbed by an already pending item.
    pub coalesced: u64,
    /// Runs that finished.
    pub completed: u64,
}

/// A cloneable handle for scheduling the work item. Never blocks.
#[derive(Clone)]
pub struct WorkHandle {
    slot: Arc<Slot>,
}

impl WorkHandle {
    /// Marks the item pending. Returns `false` if it already was.
    pub fn schedule(&self) -> bool {
        let armed = self.slot.update(|st| {
            if st.exiting || st.pending {
                false
            } else {
                st.pending = true;
                true
            }
        });
        if armed {
            self.slot.queued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.slot.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        armed
    }

    /// Drops the pending item, if any. A running item is left alone.
    /// Returns `true` if something was pending.
    pub fn cancel(&self) -> bool {
        self.slot
            .update(|st| core::mem::replace(&mut st.pending, false))
    }

    /// Cancels the pending item and schedules a fresh one, leaving exactly one
    /// item pending.
    ///
    /// Returns `true` if an idle slot was armed, `false` if a pending item was
    /// replaced or the worker is gone.
    pub fn reschedule(&self) -> bool {
        let armed = self.slot.update(|st| {
            if st.exiting {
                return false;
            }
            !core::mem::replace(&mut st.pending, true)
        });
        if armed {
            self.slot.queued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.slot.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        armed
    }

    /// Returns `true` if an item is waiting to run.
    pub fn is_pending(&self) -> bool {
        self.slot.state.lock().pending
    }

    /// Returns `true` if the callback is executing.
    pub fn is_running(&self) -> bool {
        self.slot.state.lock().running
    }

    /// Returns the slot counters.
    pub fn stats(&self) -> WorkStats {
        WorkStats {
            queued: self.slot.queued.load(Ordering::Relaxed),
            coalesced: self.slot.coalesced.load(Ordering::Relaxed),
            completed: self.slot.completed.load(Ordering::Relaxed),
        }
    }
}

/// A work item bound to its own worker thread.
pub struct DeferredWork {
    handle: WorkHandle,
    worker: Option<JoinHandle<()>>,
}

impl DeferredWork {
    /// Starts a worker thread named `name` that runs `func` each time the
    /// item is scheduled.
    pub fn spawn(name: &str, func: impl Into<WorkFn>) -> Result<Self> {
        let func = func.into();
        let slot = Arc::new(Slot::default());
        let worker_slot = slot.clone();
        let worker = thread::Builder::new()
            .name(name.into())
            .spawn(move || worker_loop(&worker_slot, &func))
            .map_err(|e| {
                error!("failed to spawn worker {name}: {e}");
                Error::Spawn
            })?;
        Ok(Self {
            handle: WorkHandle { slot },
            worker: Some(worker),
        })
    }

    /// Returns a handle for scheduling the item.
    pub fn handle(&self) -> WorkHandle {
        self.handle.clone()
    }

    /// Cancels the pending item and waits for a running one to finish.
    ///
    /// Returns `true` if something was pending or running.
    pub fn cancel_sync(&self) -> bool {
        let slot = &self.handle.slot;
        let busy = slot.update(|st| {
            let busy = st.pending || st.running;
            st.pending = false;
            busy
        });
        slot.wait_until(|st| !st.running && !st.pending);
        busy
    }
}

impl Drop for DeferredWork {
    fn drop(&mut self) {
        self.handle.slot.update(|st| {
            st.pending = false;
            st.exiting = true;
        });
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }
}

fn worker_loop(slot: &Slot, func: &WorkFn) {
    loop {
        slot.wait_until(|st| st.pending || st.exiting);
        let run = slot.update(|st| {
            if st.exiting {
                return false;
            }
            st.pending = false;
            st.running = true;
            true
        });
        if !run {
            return;
        }
        func.call();
        slot.completed.fetch_add(1, Ordering::Relaxed);
        slot.update(|st| st.running = false);
    }
}
