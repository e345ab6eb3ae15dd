//! Counting gate that bounds the number of outstanding buffers.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A counting semaphore sized to the pool.
///
/// The producer takes one slot per write and the completion notifier gives
/// one back per finished buffer, so the producer can never run more than N
/// buffers ahead of playback. `acquire_slot` is the only place the producer
/// path suspends.
#[derive(Debug)]
pub struct FlowController {
    available: Mutex<usize>,
    freed: Condvar,
}

impl FlowController {
    /// Creates a gate with `slots` units of capacity.
    pub fn new(slots: usize) -> Self {
        Self {
            available: Mutex::new(slots),
            freed: Condvar::new(),
        }
    }

    /// Blocks until a slot is free, then takes it.
    pub fn acquire_slot(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.freed.wait(&mut available);
        }
        *available -= 1;
    }

    /// Like [`acquire_slot`](Self::acquire_slot) but gives up after `timeout`.
    ///
    /// Returns `true` if a slot was taken.
    pub fn acquire_slot_timeout(&self, timeout: Duration) -> bool {
        let mut available = self.available.lock();
        let freed = self
            .freed
            .wait_while_for(&mut available, |available| *available == 0, timeout);
        if freed.timed_out() && *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire_slot(&self) -> bool {
        let mut available = self.available.lock();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Gives a slot back and wakes one waiter.
    pub fn release_slot(&self) {
        *self.available.lock() += 1;
        self.freed.notify_one();
    }

    /// Gives `slots` slots back at once and wakes every waiter.
    pub fn release_slots(&self, slots: usize) {
        if slots == 0 {
            return;
        }
        *self.available.lock() += slots;
        self.freed.notify_all();
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        *self.available.lock()
    }
}
