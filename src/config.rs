//! Configuration types for output sessions.

use std::time::Duration;

/// How the session accounts for buffers the engine has consumed.
///
/// Playback engines report progress in different ways (per-buffer
/// callbacks, played byte counts, played frame counts). This core only
/// supports per-buffer callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum BufferControl {
    /// Every completion callback frees one buffer and is counted in
    /// [`OutputStats::callbacks_counted`](crate::OutputStats::callbacks_counted).
    #[default]
    CountCallback,
}

impl BufferControl {
    /// Returns `true` if completions are counted per callback.
    #[must_use]
    pub fn counts_callbacks(&self) -> bool {
        matches!(self, Self::CountCallback)
    }
}

/// Configuration for session behavior.
///
/// Use [`OutputConfig::default()`] for the standard blocking behavior, or
/// customize as needed.
///
/// # Example
///
/// ```
/// use queued_audio_out::OutputConfig;
/// use std::time::Duration;
///
/// let config = OutputConfig {
///     write_timeout: Some(Duration::from_secs(2)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Longest time `write()` waits for a free buffer.
    ///
    /// `None` waits indefinitely, which paces the producer exactly at the
    /// hardware's playback rate. A bound turns a stalled engine into a
    /// [`OutputError::WriteTimedOut`](crate::OutputError::WriteTimedOut).
    /// Default: `None`
    pub write_timeout: Option<Duration>,

    /// Completion accounting policy.
    ///
    /// Default: [`BufferControl::CountCallback`]
    pub buffer_control: BufferControl,
}
