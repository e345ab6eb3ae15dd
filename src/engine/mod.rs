//! Playback engine abstraction and CPAL device wrapper.
//!
//! An [`OutputEngine`] is the service that actually plays buffers. The
//! session allocates buffers through it, submits filled buffers to it, and
//! receives them back through the [`CompletionNotifier`] it registers at
//! [`create_output`](OutputEngine::create_output).

mod device;
mod mock;

pub use device::CpalEngine;
pub use mock::{MockEngine, MockEngineHandle};

use cpal::traits::{DeviceTrait, HostTrait};

use crate::format::StreamDescriptor;
use crate::pool::{AudioBuffer, CompletionNotifier};
use crate::{EngineError, SubmitError};

/// A playback engine with an enqueue/callback contract.
///
/// # Contract
///
/// - `create_output` is called once per session, before any other call
/// - every submitted buffer is handed back exactly once, either through
///   [`CompletionNotifier::notify`] once it has played or from
///   [`stop`](Self::stop)
/// - `stop` is synchronous: when it returns, no further notification may
///   fire for this output
/// - completions may be reported from any thread
///
/// Implementations are not required to be `Send`; a session lives on the
/// producer's thread.
pub trait OutputEngine {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Creates the output construct for `descriptor`.
    ///
    /// `capacity_hint` is the number of buffers that may be queued at once.
    fn create_output(
        &mut self,
        descriptor: &StreamDescriptor,
        capacity_hint: usize,
        notifier: CompletionNotifier,
    ) -> Result<(), EngineError>;

    /// Allocates the memory for one buffer of at least `capacity` bytes.
    ///
    /// The length of the returned vector is the buffer's capacity.
    fn allocate_buffer(&mut self, capacity: usize) -> Result<Vec<u8>, EngineError>;

    /// Releases a buffer allocated by [`allocate_buffer`](Self::allocate_buffer).
    fn free_buffer(&mut self, buffer: AudioBuffer);

    /// Queues a filled buffer for playback.
    ///
    /// A rejected buffer is handed back inside the error.
    fn submit(&mut self, buffer: AudioBuffer) -> Result<(), SubmitError>;

    /// Starts consuming queued buffers.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Stops playback synchronously and returns every buffer not yet
    /// reported as completed.
    fn stop(&mut self) -> Result<Vec<AudioBuffer>, EngineError>;

    /// Tears down the output construct. Called after all buffers are freed.
    fn dispose_output(&mut self) {}
}

/// Lists all available output devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_output_devices() -> Result<Vec<String>, EngineError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| EngineError::backend(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Gets the name of the default output device, if any.
pub fn default_output_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}
