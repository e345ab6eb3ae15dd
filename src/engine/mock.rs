//! Simulated playback engine for testing without hardware.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::OutputEngine;
use crate::format::StreamDescriptor;
use crate::pool::{AudioBuffer, BufferId, CompletionNotifier};
use crate::{EngineError, SubmitError};

/// An in-process engine that queues buffers until told to complete them.
///
/// Every submitted payload is copied into a readback log, and every
/// engine call can be made to fail, so the whole session lifecycle can be
/// exercised in CI. The engine is moved into the session; tests drive it
/// through a [`MockEngineHandle`].
///
/// # Example
///
/// ```
/// use queued_audio_out::{AudioFormat, MockEngine, OutputSession};
///
/// let engine = MockEngine::new();
/// let handle = engine.handle();
/// let mut session = OutputSession::new(engine);
///
/// session.open(&AudioFormat::cd_quality(), 2, 1024).unwrap();
/// session.write(&[1, 2, 3]).unwrap();
///
/// assert_eq!(handle.submitted(), vec![vec![1, 2, 3]]);
/// handle.complete_next();
/// assert_eq!(session.free_buffers(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    /// Held across pop + notify, and by `stop`, so no completion lands
    /// after `stop` returns.
    completion: Arc<Mutex<()>>,
}

#[derive(Debug, Default)]
struct MockState {
    notifier: Option<CompletionNotifier>,
    descriptor: Option<StreamDescriptor>,
    queued: VecDeque<AudioBuffer>,
    submitted: Vec<Vec<u8>>,
    running: bool,
    allocation_granularity: usize,
    allocations: usize,
    frees: usize,
    starts: usize,
    stops: usize,
    leak_on_stop: bool,
    fail_create: Option<EngineError>,
    fail_allocation_at: Option<usize>,
    fail_next_submit: Option<EngineError>,
    fail_start: Option<EngineError>,
    fail_stop: Option<EngineError>,
}

impl MockEngine {
    /// Creates an engine that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle for driving and inspecting this engine.
    pub fn handle(&self) -> MockEngineHandle {
        MockEngineHandle {
            state: Arc::clone(&self.state),
            completion: Arc::clone(&self.completion),
        }
    }
}

impl OutputEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn create_output(
        &mut self,
        descriptor: &StreamDescriptor,
        _capacity_hint: usize,
        notifier: CompletionNotifier,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_create.take() {
            return Err(err);
        }
        state.descriptor = Some(*descriptor);
        state.notifier = Some(notifier);
        state.queued.clear();
        state.running = false;
        Ok(())
    }

    fn allocate_buffer(&mut self, capacity: usize) -> Result<Vec<u8>, EngineError> {
        let mut state = self.state.lock();
        if state.fail_allocation_at == Some(state.allocations) {
            state.fail_allocation_at = None;
            return Err(EngineError::backend("simulated allocation failure"));
        }
        state.allocations += 1;

        let granularity = state.allocation_granularity.max(1);
        Ok(vec![0u8; capacity.div_ceil(granularity) * granularity])
    }

    fn free_buffer(&mut self, buffer: AudioBuffer) {
        self.state.lock().frees += 1;
        drop(buffer.into_memory());
    }

    fn submit(&mut self, buffer: AudioBuffer) -> Result<(), SubmitError> {
        let mut state = self.state.lock();
        if state.notifier.is_none() {
            return Err(SubmitError::new(buffer, EngineError::NoOutput));
        }
        if let Some(err) = state.fail_next_submit.take() {
            return Err(SubmitError::new(buffer, err));
        }
        state.submitted.push(buffer.as_bytes().to_vec());
        state.queued.push_back(buffer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_start.take() {
            return Err(err);
        }
        state.running = true;
        state.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<AudioBuffer>, EngineError> {
        let _completion = self.completion.lock();
        let mut state = self.state.lock();
        if let Some(err) = state.fail_stop.take() {
            return Err(err);
        }
        state.running = false;
        state.stops += 1;

        let pending: Vec<AudioBuffer> = state.queued.drain(..).collect();
        if state.leak_on_stop {
            drop(pending);
            return Ok(Vec::new());
        }
        Ok(pending)
    }

    fn dispose_output(&mut self) {
        let mut state = self.state.lock();
        state.notifier = None;
        state.descriptor = None;
    }
}

/// Test-side view of a [`MockEngine`] owned by a session.
#[derive(Debug, Clone)]
pub struct MockEngineHandle {
    state: Arc<Mutex<MockState>>,
    completion: Arc<Mutex<()>>,
}

impl MockEngineHandle {
    /// Completes the oldest queued buffer, as if it had finished playing.
    ///
    /// Returns the completed buffer's id, or `None` if nothing is queued.
    /// The notification runs on the calling thread.
    pub fn complete_next(&self) -> Option<BufferId> {
        let _completion = self.completion.lock();
        let (buffer, notifier) = {
            let mut state = self.state.lock();
            let notifier = state.notifier.clone()?;
            (state.queued.pop_front()?, notifier)
        };

        let id = buffer.id();
        notifier.notify(buffer);
        Some(id)
    }

    /// Completes every queued buffer. Returns how many were completed.
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next().is_some() {
            completed += 1;
        }
        completed
    }

    /// Returns the notifier registered by the current output, if any.
    pub fn notifier(&self) -> Option<CompletionNotifier> {
        self.state.lock().notifier.clone()
    }

    /// Number of buffers submitted and not yet completed.
    pub fn queued_len(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Payloads of every accepted submission, in order.
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.state.lock().submitted.clone()
    }

    /// Number of accepted submissions.
    pub fn submitted_len(&self) -> usize {
        self.state.lock().submitted.len()
    }

    /// Takes the readback log, clearing it.
    pub fn take_submitted(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().submitted)
    }

    /// The descriptor of the current output.
    pub fn descriptor(&self) -> Option<StreamDescriptor> {
        self.state.lock().descriptor
    }

    /// Returns `true` between a successful `start` and the next `stop`.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Number of successful `start` calls.
    pub fn start_count(&self) -> usize {
        self.state.lock().starts
    }

    /// Number of successful `stop` calls.
    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }

    /// Number of successful allocations.
    pub fn allocated_buffers(&self) -> usize {
        self.state.lock().allocations
    }

    /// Number of freed buffers.
    pub fn freed_buffers(&self) -> usize {
        self.state.lock().frees
    }

    /// Allocated buffers that have not been freed.
    pub fn live_buffers(&self) -> usize {
        let state = self.state.lock();
        state.allocations - state.frees
    }

    /// Rounds allocation sizes up to a multiple of `bytes`.
    pub fn set_allocation_granularity(&self, bytes: usize) {
        self.state.lock().allocation_granularity = bytes;
    }

    /// Makes `stop` discard queued buffers instead of handing them back.
    pub fn set_leak_on_stop(&self, leak: bool) {
        self.state.lock().leak_on_stop = leak;
    }

    /// Fails the next `create_output`.
    pub fn fail_create(&self, error: EngineError) {
        self.state.lock().fail_create = Some(error);
    }

    /// Fails the allocation with the given zero-based index, counted from
    /// the start of the engine's life.
    pub fn fail_allocation_at(&self, index: usize) {
        self.state.lock().fail_allocation_at = Some(index);
    }

    /// Rejects the next submission.
    pub fn fail_next_submit(&self, error: EngineError) {
        self.state.lock().fail_next_submit = Some(error);
    }

    /// Fails the next `start`.
    pub fn fail_start(&self, error: EngineError) {
        self.state.lock().fail_start = Some(error);
    }

    /// Fails the next `stop`.
    pub fn fail_stop(&self, error: EngineError) {
        self.state.lock().fail_stop = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_granularity() {
        let mut engine = MockEngine::new();
        let handle = engine.handle();
        handle.set_allocation_granularity(512);

        assert_eq!(engine.allocate_buffer(1000).unwrap().len(), 1024);
        assert_eq!(engine.allocate_buffer(512).unwrap().len(), 512);
        assert_eq!(handle.allocated_buffers(), 2);
    }

    #[test]
    fn test_fail_allocation_at_index() {
        let mut engine = MockEngine::new();
        engine.handle().fail_allocation_at(1);

        assert!(engine.allocate_buffer(16).is_ok());
        assert!(engine.allocate_buffer(16).is_err());
        assert!(engine.allocate_buffer(16).is_ok());
        assert_eq!(engine.handle().allocated_buffers(), 2);
    }

    #[test]
    fn test_start_stop_tracking() {
        let mut engine = MockEngine::new();
        let handle = engine.handle();

        engine.start().unwrap();
        assert!(handle.is_running());
        assert!(engine.stop().unwrap().is_empty());
        assert!(!handle.is_running());
        assert_eq!(handle.start_count(), 1);
        assert_eq!(handle.stop_count(), 1);
    }

    #[test]
    fn test_injected_start_failure_is_one_shot() {
        let mut engine = MockEngine::new();
        engine
            .handle()
            .fail_start(EngineError::device_unavailable("unplugged"));

        assert!(engine.start().is_err());
        assert!(engine.start().is_ok());
    }

    #[test]
    fn test_stop_waits_for_completion_in_progress() {
        use std::thread;
        use std::time::Duration;

        let mut engine = MockEngine::new();
        let handle = engine.handle();

        let in_progress = handle.completion.lock();
        let stopper = thread::spawn(move || {
            engine.stop().unwrap();
            engine
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(handle.stop_count(), 0);

        drop(in_progress);
        stopper.join().unwrap();
        assert_eq!(handle.stop_count(), 1);
    }

    #[test]
    fn test_complete_next_with_nothing_queued() {
        let engine = MockEngine::new();
        assert_eq!(engine.handle().complete_next(), None);
        assert_eq!(engine.handle().complete_all(), 0);
    }
}
