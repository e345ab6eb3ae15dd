//! Builder pattern for `OutputSession`.

use std::time::Duration;

use crate::engine::OutputEngine;
use crate::format::{FormatResolver, LinearPcmResolver};
use crate::session::OutputSession;
use crate::{event_callback, BufferControl, EventCallback, OutputConfig, OutputEvent};

/// Builder for configuring an [`OutputSession`].
///
/// Use [`OutputSession::builder()`] to create a new builder. The session it
/// builds starts `Closed`; call [`open()`](OutputSession::open) to allocate
/// buffers.
///
/// # Example
///
/// ```
/// use queued_audio_out::{MockEngine, OutputSession};
/// use std::time::Duration;
///
/// let session = OutputSession::builder(MockEngine::new())
///     .write_timeout(Duration::from_secs(1))
///     .on_event(|e| tracing::warn!(?e, "output event"))
///     .build();
///
/// assert!(!session.is_open());
/// ```
#[must_use]
pub struct OutputSessionBuilder<E: OutputEngine> {
    engine: E,
    /// Session configuration.
    config: OutputConfig,
    /// Turns logical formats into engine descriptors.
    resolver: Box<dyn FormatResolver>,
    /// Event callback.
    event_callback: Option<EventCallback>,
}

impl<E: OutputEngine> OutputSessionBuilder<E> {
    /// Creates a builder with default settings around `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: OutputConfig::default(),
            resolver: Box::new(LinearPcmResolver),
            event_callback: None,
        }
    }

    /// Set custom session configuration.
    pub fn with_config(mut self, config: OutputConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound how long `write()` waits for a free buffer.
    ///
    /// Default: wait indefinitely
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    /// Set the completion accounting policy.
    ///
    /// Default: [`BufferControl::CountCallback`]
    pub fn buffer_control(mut self, buffer_control: BufferControl) -> Self {
        self.config.buffer_control = buffer_control;
        self
    }

    /// Replace the format resolver.
    ///
    /// Default: [`LinearPcmResolver`]
    pub fn format_resolver<R: FormatResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include rejected submissions, late completions, leaked buffers
    /// and stream errors. The callback may run on the engine's thread.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(OutputEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Builds the session in the `Closed` state.
    pub fn build(self) -> OutputSession<E> {
        OutputSession::from_parts(
            self.engine,
            self.config,
            self.resolver,
            self.event_callback,
        )
    }
}
