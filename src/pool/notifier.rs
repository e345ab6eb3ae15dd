//! Completion path from the engine back into the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BufferControl;
use crate::event::EventCallback;
use crate::pool::{AudioBuffer, BufferPool, FlowController};
use crate::session::SessionCounters;
use crate::{OutputEvent, PoolError};

/// State shared between the producer side of a session and its notifier.
///
/// One instance exists per open session. Closing marks it closed, so
/// notifiers held past close can no longer touch capacity.
pub(crate) struct SharedPool {
    pub pool: Mutex<BufferPool>,
    pub gate: FlowController,
    pub closed: AtomicBool,
    pub counters: SessionCounters,
    pub buffer_control: BufferControl,
    pub events: Option<EventCallback>,
}

impl SharedPool {
    /// Creates the state with an empty pool and a closed gate.
    ///
    /// The notifier can be handed to the engine before any buffer exists;
    /// [`install`](Self::install) then primes the gate.
    pub fn new(buffer_control: BufferControl, events: Option<EventCallback>) -> Self {
        Self {
            pool: Mutex::new(BufferPool::with_capacity(0)),
            gate: FlowController::new(0),
            closed: AtomicBool::new(false),
            counters: SessionCounters::default(),
            buffer_control,
            events,
        }
    }

    /// Replaces the pool and opens one gate slot per buffer.
    pub fn install(&self, pool: BufferPool) {
        let slots = pool.len();
        *self.pool.lock() = pool;
        self.gate.release_slots(slots);
    }

    pub fn emit(&self, event: OutputEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}

/// Handle the engine uses to hand finished buffers back.
///
/// Cheap to clone and safe to call from any thread, including an audio
/// callback. Each call returns one buffer to the free set and then releases
/// one unit of write capacity, waking a blocked
/// [`write`](crate::OutputSession::write).
///
/// # Example
///
/// ```ignore
/// fn on_buffer_played(notifier: &CompletionNotifier, buffer: AudioBuffer) {
///     notifier.notify(buffer);
/// }
/// ```
#[derive(Clone)]
pub struct CompletionNotifier {
    shared: Arc<SharedPool>,
}

impl CompletionNotifier {
    pub(crate) fn new(shared: Arc<SharedPool>) -> Self {
        Self { shared }
    }

    /// Reports that `buffer` finished playing.
    ///
    /// Buffers arriving after the session closed, or from another session,
    /// are dropped with an [`OutputEvent::LateCompletion`].
    pub fn notify(&self, buffer: AudioBuffer) {
        let shared = &self.shared;
        let id = buffer.id();

        let released = {
            let mut pool = shared.pool.lock();
            if shared.closed.load(Ordering::SeqCst) {
                Err(PoolError::ForeignBuffer(id))
            } else {
                pool.release(buffer)
            }
        };

        match released {
            Ok(()) => {
                shared.counters.record_completion(shared.buffer_control);
                shared.gate.release_slot();
                tracing::trace!(buffer = %id, "buffer completed");
            }
            Err(PoolError::ForeignBuffer(id)) => {
                tracing::warn!(buffer = %id, "dropping completion for buffer outside this session");
                shared.emit(OutputEvent::LateCompletion { buffer: id });
            }
            Err(err) => {
                tracing::error!(buffer = %id, error = %err, "completion violated pool invariants");
                debug_assert!(false, "completion violated pool invariants: {err}");
            }
        }
    }

    /// Reports a non-fatal playback error from the engine's stream.
    pub fn report_stream_error(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!("Audio stream error: {}", reason);
        self.shared.emit(OutputEvent::StreamInterrupted { reason });
    }

    /// Returns `true` once the owning session has closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionNotifier")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_callback;
    use std::sync::atomic::AtomicUsize;

    fn shared(count: usize, events: Option<EventCallback>) -> Arc<SharedPool> {
        let shared = SharedPool::new(BufferControl::CountCallback, events);
        shared.install(BufferPool::new(vec![vec![0u8; 8]; count]));
        Arc::new(shared)
    }

    fn take_buffer(shared: &SharedPool) -> AudioBuffer {
        assert!(shared.gate.try_acquire_slot());
        shared.pool.lock().acquire().unwrap()
    }

    #[test]
    fn test_notify_returns_buffer_and_slot() {
        let shared = shared(2, None);
        let notifier = CompletionNotifier::new(Arc::clone(&shared));

        let buffer = take_buffer(&shared);
        assert_eq!(shared.gate.available(), 1);
        assert_eq!(shared.pool.lock().free_len(), 1);

        notifier.notify(buffer);
        assert_eq!(shared.gate.available(), 2);
        assert_eq!(shared.pool.lock().free_len(), 2);
        assert_eq!(shared.counters.snapshot().buffers_completed, 1);
        assert_eq!(shared.counters.snapshot().callbacks_counted, 1);
    }

    #[test]
    fn test_notify_after_close_is_dropped() {
        let late = Arc::new(AtomicUsize::new(0));
        let events = {
            let late = Arc::clone(&late);
            event_callback(move |event| {
                if matches!(event, OutputEvent::LateCompletion { .. }) {
                    late.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        let shared = shared(1, Some(events));
        let notifier = CompletionNotifier::new(Arc::clone(&shared));
        let buffer = take_buffer(&shared);

        shared.closed.store(true, Ordering::SeqCst);
        assert!(notifier.is_closed());
        notifier.notify(buffer);

        assert_eq!(late.load(Ordering::SeqCst), 1);
        assert_eq!(shared.gate.available(), 0);
        assert_eq!(shared.pool.lock().free_len(), 0);
    }

    #[test]
    fn test_notify_from_other_session_is_dropped() {
        let first = shared(1, None);
        let second = shared(1, None);
        let buffer = take_buffer(&first);

        CompletionNotifier::new(Arc::clone(&second)).notify(buffer);

        assert_eq!(second.gate.available(), 1);
        assert_eq!(second.pool.lock().free_len(), 1);
        assert_eq!(second.counters.snapshot().buffers_completed, 0);
    }

    #[test]
    fn test_notifier_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<CompletionNotifier>();
    }
}
