//! Fixed-capacity audio buffer with ownership-tracked identity.

use std::fmt;

/// Identity of a buffer within the pool that created it.
///
/// `pool` is unique per pool instance, so a buffer that outlives its session
/// is never mistaken for a buffer of the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId {
    pub(crate) pool: u64,
    pub(crate) slot: usize,
}

impl BufferId {
    /// Position of the buffer in its pool, in allocation order.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.pool, self.slot)
    }
}

/// A fixed-capacity region of audio bytes plus the number of valid bytes.
///
/// An `AudioBuffer` is a move-only value: the producer holds it while filling,
/// the engine while playing, the pool while idle. Whoever owns the value owns
/// the memory, so a buffer can never be written by the producer while the
/// engine is still reading it.
///
/// Engines receive buffers through
/// [`OutputEngine::submit`](crate::OutputEngine::submit) and hand them back
/// through [`CompletionNotifier::notify`](crate::CompletionNotifier::notify).
pub struct AudioBuffer {
    id: BufferId,
    data: Vec<u8>,
    len: usize,
}

impl AudioBuffer {
    /// Wraps engine-allocated memory. The whole length of `data` is capacity.
    pub(crate) fn new(id: BufferId, data: Vec<u8>) -> Self {
        Self { id, data, len: 0 }
    }

    /// Returns the buffer's identity.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Returns the number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no valid bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the valid bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Copies `payload` in and records its length.
    ///
    /// Returns `false` without touching the buffer if `payload` does not fit.
    pub(crate) fn fill(&mut self, payload: &[u8]) -> bool {
        if payload.len() > self.data.len() {
            return false;
        }
        self.data[..payload.len()].copy_from_slice(payload);
        self.len = payload.len();
        true
    }

    /// Marks the contents as consumed.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    /// Releases the underlying memory to the engine that allocated it.
    pub fn into_memory(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish()
    }
}
