// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Auto-reset scheduler - one re-armable delayed reset
//!
//! The scheduler owns a single pending slot. Arming aborts whatever is in the
//! slot and installs a new generation, so at most one reset is ever live. A
//! superseded task that already woke up and is waiting for the state lock
//! finds its generation gone and does nothing.
//!
//! The scheduler itself lives inside the monitor's state mutex; arming and
//! consuming the slot happen under the same lock as the state mutation.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Error, Result};

struct PendingReset {
    generation: u64,
    fire_at: Instant,
    handle: JoinHandle<()>,
}

/// The single pending auto-reset. Lives inside the monitor state lock.
pub struct AutoResetScheduler {
    pending: Option<PendingReset>,
    /// Last generation handed out
    issued: u64,
}

impl AutoResetScheduler {
    /// Empty slot, nothing armed
    pub fn new() -> Self {
        Self {
            pending: None,
            issued: 0,
        }
    }

    /// Cancel any pending reset and schedule a new one `delay` from now.
    ///
    /// `spawn` receives the new generation and deadline and must return the
    /// task that will call back with that generation once the deadline passes.
    pub fn arm<F>(&mut self, delay: Duration, spawn: F) -> u64
    where
        F: FnOnce(u64, Instant) -> JoinHandle<()>,
    {
        self.cancel();

        self.issued += 1;
        let generation = self.issued;
        let fire_at = Instant::now() + delay;
        let handle = spawn(generation, fire_at);

        self.pending = Some(PendingReset {
            generation,
            fire_at,
            handle,
        });
        debug!(generation, ?delay, "Auto-reset armed");
        generation
    }

    /// Abort the pending reset, if any
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                trace!(generation = pending.generation, "Auto-reset cancelled");
                true
            }
            None => false,
        }
    }

    /// Fire time of the armed reset
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.fire_at)
    }

    /// Generation of the armed reset
    pub fn pending_generation(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.generation)
    }

    /// Consume the slot for a firing task.
    ///
    /// Returns `Ok(true)` when `generation` is the live one and the reset
    /// should run, `Ok(false)` when it was superseded.
    pub fn take_due(&mut self, generation: u64) -> Result<bool> {
        if generation == 0 || generation > self.issued {
            return Err(Error::SchedulerRaceDetected { generation });
        }
        match &self.pending {
            Some(pending) if pending.generation == generation => {
                // The caller is the task behind this handle; drop without aborting
                self.pending = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Default for AutoResetScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AutoResetScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
