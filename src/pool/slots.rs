//! Fixed-size pool partitioning buffers into free and in-flight sets.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pool::{AudioBuffer, BufferId};
use crate::PoolError;

/// Source of process-unique pool ids.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    InFlight,
}

/// Arena of N buffer slots with a FIFO free queue.
///
/// Every slot is either free (its buffer sits in the queue) or in flight
/// (its buffer is held by the producer or the engine). The pool itself is
/// not synchronized; the session wraps it in a single mutex shared with the
/// completion notifier.
#[derive(Debug)]
pub struct BufferPool {
    id: u64,
    slots: Vec<SlotState>,
    free: VecDeque<AudioBuffer>,
}

impl BufferPool {
    /// Builds a pool from engine-allocated memory. All buffers start free.
    pub fn new(memory: Vec<Vec<u8>>) -> Self {
        let mut pool = Self::with_capacity(memory.len());
        for data in memory {
            pool.push(data);
        }
        pool
    }

    /// Creates an empty pool with room for `count` buffers.
    pub fn with_capacity(count: usize) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::with_capacity(count),
            free: VecDeque::with_capacity(count),
        }
    }

    /// Adds engine-allocated memory as a new free buffer in the next slot.
    pub fn push(&mut self, data: Vec<u8>) {
        let id = BufferId {
            pool: self.id,
            slot: self.slots.len(),
        };
        self.slots.push(SlotState::Free);
        self.free.push_back(AudioBuffer::new(id, data));
    }

    /// Removes the oldest free buffer.
    pub fn acquire(&mut self) -> Result<AudioBuffer, PoolError> {
        let buffer = self.free.pop_front().ok_or(PoolError::Exhausted)?;
        self.slots[buffer.id().slot] = SlotState::InFlight;
        Ok(buffer)
    }

    /// Returns an in-flight buffer to the back of the free queue.
    ///
    /// On error the buffer is dropped; it does not belong in this pool.
    pub fn release(&mut self, mut buffer: AudioBuffer) -> Result<(), PoolError> {
        let id = buffer.id();
        if id.pool != self.id || id.slot >= self.slots.len() {
            return Err(PoolError::ForeignBuffer(id));
        }
        if self.slots[id.slot] == SlotState::Free {
            return Err(PoolError::DoubleRelease(id));
        }

        buffer.clear();
        self.slots[id.slot] = SlotState::Free;
        self.free.push_back(buffer);
        Ok(())
    }

    /// Removes every free buffer, leaving their slots in flight.
    ///
    /// Used at close to hand memory back to the engine.
    pub fn drain(&mut self) -> Vec<AudioBuffer> {
        for buffer in &self.free {
            self.slots[buffer.id().slot] = SlotState::InFlight;
        }
        self.free.drain(..).collect()
    }

    /// Total number of buffers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the pool holds no buffers at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buffers available for writing.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Number of buffers held by the producer or the engine.
    pub fn in_flight_len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Verifies that the free queue and the slot states agree.
    pub fn check_invariants(&self) -> bool {
        let free_slots = self
            .slots
            .iter()
            .filter(|state| **state == SlotState::Free)
            .count();
        let mut seen = vec![false; self.slots.len()];
        let queue_consistent = self.free.iter().all(|buffer| {
            let slot = buffer.id().slot;
            let first_time = !std::mem::replace(&mut seen[slot], true);
            first_time && self.slots[slot] == SlotState::Free
        });
        free_slots == self.free.len() && queue_consistent
    }
}
