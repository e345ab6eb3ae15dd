//! Output session lifecycle: open, write, play, close.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::BufferControl;
use crate::engine::OutputEngine;
use crate::event::EventCallback;
use crate::format::{AudioFormat, FormatResolver, StreamDescriptor};
use crate::pool::{BufferPool, CompletionNotifier, SharedPool};
use crate::{OutputConfig, OutputError, OutputEvent, OutputSessionBuilder, SubmitError};

/// Statistics about an output session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputStats {
    /// Buffers accepted by the engine.
    pub buffers_submitted: u64,
    /// Buffers the engine reported as played.
    pub buffers_completed: u64,
    /// Payload bytes accepted by the engine.
    pub bytes_submitted: u64,
    /// Submissions the engine rejected.
    pub submit_failures: u64,
    /// Completion callbacks counted under [`BufferControl::CountCallback`].
    pub callbacks_counted: u64,
}

/// Counters shared between the producer and the notifier.
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    buffers_submitted: AtomicU64,
    buffers_completed: AtomicU64,
    bytes_submitted: AtomicU64,
    submit_failures: AtomicU64,
    callbacks_counted: AtomicU64,
}

impl SessionCounters {
    pub fn record_submit(&self, bytes: usize) {
        self.buffers_submitted.fetch_add(1, Ordering::SeqCst);
        self.bytes_submitted.fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub fn record_submit_failure(&self) {
        self.submit_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_completion(&self, buffer_control: BufferControl) {
        self.buffers_completed.fetch_add(1, Ordering::SeqCst);
        if buffer_control.counts_callbacks() {
            self.callbacks_counted.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> OutputStats {
        OutputStats {
            buffers_submitted: self.buffers_submitted.load(Ordering::SeqCst),
            buffers_completed: self.buffers_completed.load(Ordering::SeqCst),
            bytes_submitted: self.bytes_submitted.load(Ordering::SeqCst),
            submit_failures: self.submit_failures.load(Ordering::SeqCst),
            callbacks_counted: self.callbacks_counted.load(Ordering::SeqCst),
        }
    }
}

/// Lifecycle state of an [`OutputSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No buffers exist; only `open()` is valid.
    #[default]
    Closed,
    /// Buffers are allocated and may be written; the engine is not consuming.
    Open,
    /// The engine is consuming submitted buffers.
    Playing,
}

/// Everything that exists only while the session is open.
struct ActiveOutput {
    shared: Arc<SharedPool>,
    format: AudioFormat,
    descriptor: StreamDescriptor,
    buffer_capacity: usize,
}

/// A bounded, blocking queue of audio buffers in front of an
/// [`OutputEngine`].
///
/// # Lifecycle
///
/// 1. [`open()`](Self::open) allocates the buffers and primes capacity
/// 2. [`write()`](Self::write) fills one free buffer per call and submits it,
///    blocking while all buffers are in flight
/// 3. [`play()`](Self::play) starts the engine
/// 4. [`close()`](Self::close) stops the engine and frees the buffers;
///    the session can then be opened again
///
/// Dropping an open session closes it (but prefer explicit `close()`).
///
/// # Example
///
/// ```
/// use queued_audio_out::{AudioFormat, MockEngine, OutputSession};
///
/// let engine = MockEngine::new();
/// let handle = engine.handle();
///
/// let mut session = OutputSession::new(engine);
/// session.open(&AudioFormat::cd_quality(), 3, 4096)?;
/// session.write(&[0u8; 2048])?;
/// session.play()?;
///
/// handle.complete_all();
/// session.close()?;
/// # Ok::<(), queued_audio_out::OutputError>(())
/// ```
pub struct OutputSession<E: OutputEngine> {
    engine: E,
    config: OutputConfig,
    resolver: Box<dyn FormatResolver>,
    events: Option<EventCallback>,
    state: SessionState,
    active: Option<ActiveOutput>,
    last_stats: OutputStats,
}

impl<E: OutputEngine> OutputSession<E> {
    /// Creates a closed session with default settings.
    pub fn new(engine: E) -> Self {
        Self::builder(engine).build()
    }

    /// Returns a builder for configuring a session around `engine`.
    pub fn builder(engine: E) -> OutputSessionBuilder<E> {
        OutputSessionBuilder::new(engine)
    }

    pub(crate) fn from_parts(
        engine: E,
        config: OutputConfig,
        resolver: Box<dyn FormatResolver>,
        events: Option<EventCallback>,
    ) -> Self {
        Self {
            engine,
            config,
            resolver,
            events,
            state: SessionState::Closed,
            active: None,
            last_stats: OutputStats::default(),
        }
    }

    /// Allocates `buffer_count` buffers of at least `buffer_capacity` bytes
    /// and prepares the engine for `format`.
    ///
    /// Allocation is all-or-nothing: if any buffer fails, the ones already
    /// allocated are freed before the error is returned.
    ///
    /// # Errors
    ///
    /// - `AlreadyOpen` if the session is open
    /// - `InvalidConfig` if either count is zero
    /// - `FormatUnsupported` if the format cannot be resolved
    /// - `EngineCreateFailed` / `AllocationFailed` from the engine
    pub fn open(
        &mut self,
        format: &AudioFormat,
        buffer_count: usize,
        buffer_capacity: usize,
    ) -> Result<(), OutputError> {
        if self.state != SessionState::Closed {
            return Err(OutputError::AlreadyOpen);
        }
        if buffer_count == 0 {
            return Err(OutputError::InvalidConfig {
                reason: "buffer count must be at least 1".to_string(),
            });
        }
        if buffer_capacity == 0 {
            return Err(OutputError::InvalidConfig {
                reason: "buffer capacity must be at least 1 byte".to_string(),
            });
        }

        let descriptor = self.resolver.resolve(format)?;
        let shared = Arc::new(SharedPool::new(
            self.config.buffer_control,
            self.events.clone(),
        ));

        self.engine
            .create_output(
                &descriptor,
                buffer_count,
                CompletionNotifier::new(Arc::clone(&shared)),
            )
            .map_err(OutputError::EngineCreateFailed)?;

        let pool = match self.allocate_all(buffer_count, buffer_capacity) {
            Ok(pool) => pool,
            Err(err) => {
                shared.closed.store(true, Ordering::SeqCst);
                self.engine.dispose_output();
                return Err(err);
            }
        };

        shared.install(pool);

        tracing::debug!(
            engine = self.engine.name(),
            buffer_count,
            buffer_capacity,
            sample_rate = format.sample_rate,
            channels = format.channels,
            "output opened"
        );

        self.active = Some(ActiveOutput {
            shared,
            format: *format,
            descriptor,
            buffer_capacity,
        });
        self.state = SessionState::Open;
        Ok(())
    }

    fn allocate_all(&mut self, count: usize, capacity: usize) -> Result<BufferPool, OutputError> {
        let mut pool = BufferPool::with_capacity(count);
        for index in 0..count {
            let allocated = self.engine.allocate_buffer(capacity).and_then(|data| {
                if data.len() < capacity {
                    return Err(crate::EngineError::rejected(format!(
                        "allocated {} bytes, {} requested",
                        data.len(),
                        capacity
                    )));
                }
                Ok(data)
            });

            match allocated {
                Ok(data) => pool.push(data),
                Err(source) => {
                    tracing::warn!(
                        index,
                        count,
                        error = %source,
                        "buffer allocation failed, rolling back"
                    );
                    for buffer in pool.drain() {
                        self.engine.free_buffer(buffer);
                    }
                    return Err(OutputError::AllocationFailed {
                        index,
                        count,
                        source,
                    });
                }
            }
        }
        Ok(pool)
    }

    /// Copies `payload` into a free buffer and queues it for playback.
    ///
    /// Blocks while every buffer is in flight, until the engine completes
    /// one (or until the configured write timeout expires). Success means
    /// the payload is queued, not that it has played.
    ///
    /// # Errors
    ///
    /// - `NotOpen` before `open()` or after `close()`
    /// - `PayloadTooLarge` if `payload` exceeds the buffer capacity; this is
    ///   checked before waiting, so it never blocks or consumes capacity
    /// - `WriteTimedOut` if a write timeout is configured and expires
    /// - `EngineSubmitFailed` if the engine rejects the buffer; the buffer
    ///   and its capacity are returned to the pool
    pub fn write(&mut self, payload: &[u8]) -> Result<(), OutputError> {
        let active = self.active.as_ref().ok_or(OutputError::NotOpen)?;
        if payload.len() > active.buffer_capacity {
            return Err(OutputError::PayloadTooLarge {
                size: payload.len(),
                capacity: active.buffer_capacity,
            });
        }
        let shared = Arc::clone(&active.shared);

        match self.config.write_timeout {
            None => shared.gate.acquire_slot(),
            Some(timeout) => {
                if !shared.gate.acquire_slot_timeout(timeout) {
                    return Err(OutputError::WriteTimedOut { timeout });
                }
            }
        }

        let acquired = shared.pool.lock().acquire();
        let mut buffer = match acquired {
            Ok(buffer) => buffer,
            Err(err) => {
                shared.gate.release_slot();
                tracing::error!(error = %err, "gate admitted a write with no free buffer");
                debug_assert!(false, "gate admitted a write with no free buffer");
                return Err(err.into());
            }
        };

        if !buffer.fill(payload) {
            let capacity = buffer.capacity();
            Self::return_buffer(&shared, buffer);
            return Err(OutputError::PayloadTooLarge {
                size: payload.len(),
                capacity,
            });
        }

        let id = buffer.id();
        match self.engine.submit(buffer) {
            Ok(()) => {
                shared.counters.record_submit(payload.len());
                tracing::trace!(buffer = %id, bytes = payload.len(), "buffer submitted");
                Ok(())
            }
            Err(SubmitError { buffer, error }) => {
                shared.counters.record_submit_failure();
                tracing::warn!(buffer = %id, error = %error, "engine rejected buffer");
                shared.emit(OutputEvent::SubmitRejected {
                    buffer: id,
                    reason: error.to_string(),
                });
                Self::return_buffer(&shared, buffer);
                Err(OutputError::EngineSubmitFailed(error))
            }
        }
    }

    /// Puts a buffer the engine never took back in the pool, with its slot.
    fn return_buffer(shared: &SharedPool, buffer: crate::AudioBuffer) {
        let released = shared.pool.lock().release(buffer);
        match released {
            Ok(()) => shared.gate.release_slot(),
            Err(err) => {
                tracing::error!(error = %err, "could not return unsubmitted buffer");
                debug_assert!(false, "could not return unsubmitted buffer: {err}");
            }
        }
    }

    /// Starts the engine consuming submitted buffers.
    ///
    /// Calling `play()` while already playing does nothing.
    ///
    /// # Errors
    ///
    /// - `NotOpen` if the session is closed
    /// - `EngineStartFailed` if the engine cannot start; the session stays open
    pub fn play(&mut self) -> Result<(), OutputError> {
        match self.state {
            SessionState::Closed => Err(OutputError::NotOpen),
            SessionState::Playing => Ok(()),
            SessionState::Open => {
                self.engine
                    .start()
                    .map_err(OutputError::EngineStartFailed)?;
                tracing::debug!(engine = self.engine.name(), "playback started");
                self.state = SessionState::Playing;
                Ok(())
            }
        }
    }

    /// Stops the engine, frees every buffer and returns to `Closed`.
    ///
    /// The engine is stopped synchronously before any buffer is freed, so
    /// no completion can arrive for freed memory.
    ///
    /// # Errors
    ///
    /// - `NotOpen` if the session is already closed
    /// - `EngineStopFailed` if the engine cannot stop; the session stays
    ///   open and `close()` may be retried
    pub fn close(&mut self) -> Result<(), OutputError> {
        let shared = match self.active.as_ref() {
            Some(active) => Arc::clone(&active.shared),
            None => return Err(OutputError::NotOpen),
        };

        let pending = self.engine.stop().map_err(OutputError::EngineStopFailed)?;

        let (buffers, leaked) = {
            let mut pool = shared.pool.lock();
            for buffer in pending {
                if let Err(err) = pool.release(buffer) {
                    tracing::warn!(error = %err, "engine returned a buffer outside this session");
                }
            }
            shared.closed.store(true, Ordering::SeqCst);
            let leaked = pool.in_flight_len();
            (pool.drain(), leaked)
        };

        if leaked > 0 {
            tracing::warn!(count = leaked, "engine did not return all buffers before close");
            shared.emit(OutputEvent::BuffersLeaked { count: leaked });
        }

        for buffer in buffers {
            self.engine.free_buffer(buffer);
        }
        self.engine.dispose_output();

        self.last_stats = shared.counters.snapshot();
        self.active = None;
        self.state = SessionState::Closed;
        tracing::debug!(engine = self.engine.name(), "output closed");
        Ok(())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` if the session is open (playing or not).
    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// Returns `true` if the engine is consuming buffers.
    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    /// Number of buffers in the pool, or 0 when closed.
    pub fn buffer_count(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.shared.pool.lock().len())
    }

    /// Largest payload accepted by `write()`, or 0 when closed.
    pub fn buffer_capacity(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.buffer_capacity)
    }

    /// Number of buffers free for writing, or 0 when closed.
    pub fn free_buffers(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.shared.pool.lock().free_len())
    }

    /// Number of buffers held by the engine, or 0 when closed.
    pub fn in_flight_buffers(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.shared.pool.lock().in_flight_len())
    }

    /// Number of writes that would proceed without blocking.
    pub fn available_slots(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |active| active.shared.gate.available())
    }

    /// Returns `true` if the free and in-flight sets partition the pool.
    ///
    /// Always `true` when closed.
    pub fn pool_is_consistent(&self) -> bool {
        self.active.as_ref().map_or(true, |active| {
            let pool = active.shared.pool.lock();
            pool.check_invariants() && pool.free_len() + pool.in_flight_len() == pool.len()
        })
    }

    /// Statistics of the open output, or of the last closed one.
    pub fn stats(&self) -> OutputStats {
        self.active.as_ref().map_or_else(
            || self.last_stats.clone(),
            |active| active.shared.counters.snapshot(),
        )
    }

    /// The logical format of the open output.
    pub fn format(&self) -> Option<AudioFormat> {
        self.active.as_ref().map(|active| active.format)
    }

    /// The engine descriptor of the open output.
    pub fn descriptor(&self) -> Option<StreamDescriptor> {
        self.active.as_ref().map(|active| active.descriptor)
    }

    /// The session's configuration.
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// The engine's name.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Borrows the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: OutputEngine> Drop for OutputSession<E> {
    fn drop(&mut self) {
        if self.is_open() {
            // Session dropped without explicit close() - release the engine's buffers
            if let Err(err) = self.close() {
                tracing::warn!(error = %err, "failed to close output session on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineError, MockEngine, PoolError};
    use std::time::Duration;

    fn open_session(
        count: usize,
        capacity: usize,
    ) -> (OutputSession<MockEngine>, crate::MockEngineHandle) {
        let engine = MockEngine::new();
        let handle = engine.handle();
        let mut session = OutputSession::new(engine);
        session
            .open(&AudioFormat::cd_quality(), count, capacity)
            .unwrap();
        (session, handle)
    }

    #[test]
    fn test_session_counters_snapshot() {
        let counters = SessionCounters::default();
        counters.record_submit(100);
        counters.record_submit(28);
        counters.record_submit_failure();
        counters.record_completion(BufferControl::CountCallback);

        let stats = counters.snapshot();
        assert_eq!(stats.buffers_submitted, 2);
        assert_eq!(stats.bytes_submitted, 128);
        assert_eq!(stats.submit_failures, 1);
        assert_eq!(stats.buffers_completed, 1);
        assert_eq!(stats.callbacks_counted, 1);
    }

    #[test]
    fn test_output_stats_default() {
        let stats = OutputStats::default();
        assert_eq!(stats.buffers_submitted, 0);
        assert_eq!(stats.buffers_completed, 0);
    }

    #[test]
    fn test_open_initializes_pool() {
        for count in 1..=5 {
            let (session, handle) = open_session(count, 256);
            assert_eq!(session.state(), SessionState::Open);
            assert_eq!(session.buffer_count(), count);
            assert_eq!(session.free_buffers(), count);
            assert_eq!(session.in_flight_buffers(), 0);
            assert_eq!(session.available_slots(), count);
            assert_eq!(handle.allocated_buffers(), count);
            assert!(session.pool_is_consistent());
        }
    }

    #[test]
    fn test_open_rejects_zero_counts() {
        let mut session = OutputSession::new(MockEngine::new());
        let format = AudioFormat::cd_quality();
        assert!(matches!(
            session.open(&format, 0, 1024),
            Err(OutputError::InvalidConfig { .. })
        ));
        assert!(matches!(
            session.open(&format, 4, 0),
            Err(OutputError::InvalidConfig { .. })
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_open_twice_rejected() {
        let (mut session, _handle) = open_session(2, 64);
        assert!(matches!(
            session.open(&AudioFormat::cd_quality(), 2, 64),
            Err(OutputError::AlreadyOpen)
        ));
        assert_eq!(session.buffer_count(), 2);
    }

    #[test]
    fn test_open_unsupported_format() {
        let engine = MockEngine::new();
        let handle = engine.handle();
        let mut session = OutputSession::new(engine);
        let format = AudioFormat::new(0, 2, crate::SampleFormat::I16);

        assert!(matches!(
            session.open(&format, 2, 64),
            Err(OutputError::FormatUnsupported { .. })
        ));
        assert_eq!(handle.allocated_buffers(), 0);
        assert!(!session.is_open());
    }

    #[test]
    fn test_open_create_failure() {
        let engine = MockEngine::new();
        let handle = engine.handle();
        handle.fail_create(EngineError::device_unavailable("no device"));
        let mut session = OutputSession::new(engine);

        assert!(matches!(
            session.open(&AudioFormat::cd_quality(), 2, 64),
            Err(OutputError::EngineCreateFailed(_))
        ));
        assert!(!session.is_open());
        assert_eq!(handle.allocated_buffers(), 0);
    }

    #[test]
    fn test_open_allocation_failure_rolls_back() {
        let engine = MockEngine::new();
        let handle = engine.handle();
        handle.fail_allocation_at(3);
        let mut session = OutputSession::new(engine);

        let err = session.open(&AudioFormat::cd_quality(), 5, 64).unwrap_err();
        assert!(matches!(
            err,
            OutputError::AllocationFailed {
                index: 3,
                count: 5,
                ..
            }
        ));
        assert_eq!(handle.allocated_buffers(), 3);
        assert_eq!(handle.freed_buffers(), 3);
        assert_eq!(handle.live_buffers(), 0);
        assert!(handle.notifier().is_none());
        assert!(!session.is_open());

        // The session is reusable after a failed open.
        session.open(&AudioFormat::cd_quality(), 5, 64).unwrap();
        assert_eq!(session.free_buffers(), 5);
    }

    #[test]
    fn test_engine_capacity_may_exceed_request() {
        let engine = MockEngine::new();
        let handle = engine.handle();
        handle.set_allocation_granularity(1000);
        let mut session = OutputSession::new(engine);
        session.open(&AudioFormat::cd_quality(), 2, 10).unwrap();

        // Payload bound is the requested capacity, not the allocated one.
        assert_eq!(session.buffer_capacity(), 10);
        assert!(matches!(
            session.write(&[0u8; 11]),
            Err(OutputError::PayloadTooLarge { size: 11, capacity: 10 })
        ));
    }

    #[test]
    fn test_write_before_open() {
        let mut session = OutputSession::new(MockEngine::new());
        assert!(matches!(session.write(&[1, 2, 3]), Err(OutputError::NotOpen)));
    }

    #[test]
    fn test_write_submits_payload() {
        let (mut session, handle) = open_session(2, 16);
        session.write(&[1, 2, 3, 4]).unwrap();

        assert_eq!(handle.submitted(), vec![vec![1, 2, 3, 4]]);
        assert_eq!(session.free_buffers(), 1);
        assert_eq!(session.in_flight_buffers(), 1);
        assert_eq!(session.stats().buffers_submitted, 1);
        assert_eq!(session.stats().bytes_submitted, 4);
    }

    #[test]
    fn test_write_oversized_payload_keeps_capacity() {
        let (mut session, handle) = open_session(1, 8);
        session.write(&[0u8; 8]).unwrap();

        // Pool is exhausted; an oversized write must fail rather than block.
        assert!(matches!(
            session.write(&[0u8; 9]),
            Err(OutputError::PayloadTooLarge { size: 9, capacity: 8 })
        ));
        assert_eq!(session.available_slots(), 0);
        assert_eq!(handle.submitted_len(), 1);
    }

    #[test]
    fn test_submit_failure_returns_buffer() {
        let (mut session, handle) = open_session(2, 16);
        handle.fail_next_submit(EngineError::rejected("queue full"));

        assert!(matches!(
            session.write(&[1, 2]),
            Err(OutputError::EngineSubmitFailed(_))
        ));
        assert_eq!(session.free_buffers(), 2);
        assert_eq!(session.available_slots(), 2);
        assert_eq!(session.stats().submit_failures, 1);
        assert!(session.pool_is_consistent());

        session.write(&[3, 4]).unwrap();
        assert_eq!(handle.submitted(), vec![vec![3, 4]]);
    }

    #[test]
    fn test_write_timeout() {
        let engine = MockEngine::new();
        let mut session = OutputSession::builder(engine)
            .write_timeout(Duration::from_millis(20))
            .build();
        session.open(&AudioFormat::cd_quality(), 1, 16).unwrap();
        session.write(&[1]).unwrap();

        assert!(matches!(
            session.write(&[2]),
            Err(OutputError::WriteTimedOut { .. })
        ));
        assert_eq!(session.in_flight_buffers(), 1);
        assert_eq!(session.available_slots(), 0);
    }

    #[test]
    fn test_play_transitions_and_is_idempotent() {
        let (mut session, handle) = open_session(2, 16);
        session.play().unwrap();
        assert!(session.is_playing());
        session.play().unwrap();
        assert_eq!(handle.start_count(), 1);
    }

    #[test]
    fn test_play_failure_stays_open() {
        let (mut session, handle) = open_session(2, 16);
        handle.fail_start(EngineError::device_unavailable("unplugged"));

        assert!(matches!(
            session.play(),
            Err(OutputError::EngineStartFailed(_))
        ));
        assert_eq!(session.state(), SessionState::Open);

        session.play().unwrap();
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn test_play_before_open() {
        let mut session = OutputSession::new(MockEngine::new());
        assert!(matches!(session.play(), Err(OutputError::NotOpen)));
    }

    #[test]
    fn test_close_frees_all_buffers() {
        let (mut session, handle) = open_session(3, 16);
        session.write(&[1]).unwrap();
        session.write(&[2]).unwrap();
        session.play().unwrap();
        handle.complete_next();

        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(handle.stop_count(), 1);
        assert_eq!(handle.freed_buffers(), 3);
        assert_eq!(handle.live_buffers(), 0);
        assert_eq!(session.buffer_count(), 0);
        assert_eq!(session.stats().buffers_completed, 1);
    }

    #[test]
    fn test_close_when_closed() {
        let mut session = OutputSession::new(MockEngine::new());
        assert!(matches!(session.close(), Err(OutputError::NotOpen)));
    }

    #[test]
    fn test_close_stop_failure_can_retry() {
        let (mut session, handle) = open_session(2, 16);
        session.write(&[1]).unwrap();
        handle.fail_stop(EngineError::backend("busy"));

        assert!(matches!(
            session.close(),
            Err(OutputError::EngineStopFailed(_))
        ));
        assert!(session.is_open());
        assert_eq!(handle.freed_buffers(), 0);

        session.close().unwrap();
        assert_eq!(handle.live_buffers(), 0);
    }

    #[test]
    fn test_drop_closes_session() {
        let (session, handle) = open_session(2, 16);
        drop(session);
        assert_eq!(handle.stop_count(), 1);
        assert_eq!(handle.live_buffers(), 0);
    }

    #[test]
    fn test_internal_error_variant() {
        let err = OutputError::from(PoolError::Exhausted);
        assert_eq!(err.to_string(), "internal buffer pool error: buffer pool exhausted");
    }
}
