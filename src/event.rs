//! Runtime events for monitoring output health.
//!
//! Events are non-fatal notifications. The session keeps running after an
//! event is emitted; they are meant for logging and metrics, not for error
//! handling.

use std::sync::Arc;

use crate::pool::BufferId;

/// Runtime events emitted by an output session.
///
/// Events may be emitted from the engine's notification thread, so the
/// callback must be cheap and must not call back into the session.
///
/// # Example
///
/// ```
/// use queued_audio_out::OutputEvent;
///
/// fn handle_event(event: OutputEvent) {
///     match event {
///         OutputEvent::SubmitRejected { buffer, reason } => {
///             eprintln!("Buffer {} rejected: {}", buffer, reason);
///         }
///         OutputEvent::LateCompletion { buffer } => {
///             eprintln!("Ignored completion for {}", buffer);
///         }
///         OutputEvent::BuffersLeaked { count } => {
///             eprintln!("{} buffers were not returned by the engine", count);
///         }
///         OutputEvent::StreamInterrupted { reason } => {
///             eprintln!("Stream interrupted: {}", reason);
///         }
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum OutputEvent {
    /// The engine refused a filled buffer.
    ///
    /// The buffer went back to the pool; the write that produced it
    /// returned [`OutputError::EngineSubmitFailed`](crate::OutputError::EngineSubmitFailed).
    SubmitRejected {
        /// The rejected buffer.
        buffer: BufferId,
        /// The engine's reason.
        reason: String,
    },

    /// A completion arrived for a buffer this session no longer tracks.
    ///
    /// Happens when an engine reports completions after `close()` or
    /// hands back a buffer from a previous session.
    LateCompletion {
        /// The buffer reported by the engine.
        buffer: BufferId,
    },

    /// Buffers the engine never returned by the time the session closed.
    BuffersLeaked {
        /// Number of missing buffers.
        count: usize,
    },

    /// The engine's stream reported an error while playing.
    ///
    /// Playback may continue; underruns are padded with silence.
    StreamInterrupted {
        /// Description of the error.
        reason: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via
/// [`OutputSessionBuilder::on_event()`](crate::OutputSessionBuilder::on_event).
pub type EventCallback = Arc<dyn Fn(OutputEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use queued_audio_out::{event_callback, OutputEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(OutputEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
