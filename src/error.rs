//! Error types for queued-audio-out.
//!
//! Errors are split into three categories:
//! - **Session errors** ([`OutputError`]): returned from the public
//!   [`OutputSession`](crate::OutputSession) operations
//! - **Engine errors** ([`EngineError`]): reported by an
//!   [`OutputEngine`](crate::OutputEngine) implementation
//! - **Pool errors** ([`PoolError`]): internal invariant violations in the
//!   buffer pool

use std::time::Duration;

use crate::pool::{AudioBuffer, BufferId};

/// Errors returned by [`OutputSession`](crate::OutputSession) operations.
///
/// Caller-contract errors ([`PayloadTooLarge`](Self::PayloadTooLarge),
/// [`NotOpen`](Self::NotOpen), [`AlreadyOpen`](Self::AlreadyOpen),
/// [`InvalidConfig`](Self::InvalidConfig)) leave the session untouched.
/// Engine and resource errors leave the pool consistent: no buffer or
/// write capacity is leaked.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The logical format cannot be expressed as an engine descriptor.
    #[error("unsupported audio format: {reason}")]
    FormatUnsupported {
        /// Why the format was rejected.
        reason: String,
    },

    /// The open parameters are unusable.
    #[error("invalid output configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the parameters.
        reason: String,
    },

    /// `open()` was called on a session that is already open.
    #[error("output session is already open")]
    AlreadyOpen,

    /// The operation requires an open session.
    #[error("output session is not open")]
    NotOpen,

    /// The payload does not fit in a single buffer.
    #[error("payload of {size} bytes exceeds buffer capacity of {capacity} bytes")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Capacity of each pool buffer.
        capacity: usize,
    },

    /// The engine could not create its output construct.
    #[error("engine failed to create output: {0}")]
    EngineCreateFailed(#[source] EngineError),

    /// A buffer allocation failed; all earlier allocations were rolled back.
    #[error("failed to allocate buffer {index} of {count}: {source}")]
    AllocationFailed {
        /// Zero-based index of the allocation that failed.
        index: usize,
        /// Number of buffers requested.
        count: usize,
        /// The engine's error.
        #[source]
        source: EngineError,
    },

    /// The engine rejected a filled buffer.
    #[error("engine rejected buffer submission: {0}")]
    EngineSubmitFailed(#[source] EngineError),

    /// The engine could not start consuming buffers.
    #[error("engine failed to start: {0}")]
    EngineStartFailed(#[source] EngineError),

    /// The engine could not be stopped; the session remains open.
    #[error("engine failed to stop: {0}")]
    EngineStopFailed(#[source] EngineError),

    /// No buffer was returned by the engine within the configured timeout.
    #[error("no buffer became free within {timeout:?}")]
    WriteTimedOut {
        /// The configured write timeout.
        timeout: Duration,
    },

    /// A pool invariant was violated. Indicates a logic defect.
    #[error("internal buffer pool error: {0}")]
    Internal(#[from] PoolError),
}

/// Errors reported by an [`OutputEngine`](crate::OutputEngine).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The output device could not be found or opened.
    #[error("device unavailable: {reason}")]
    DeviceUnavailable {
        /// Why the device is unavailable.
        reason: String,
    },

    /// The stream descriptor is not playable by this engine.
    #[error("unsupported stream descriptor: {reason}")]
    UnsupportedDescriptor {
        /// What the engine could not handle.
        reason: String,
    },

    /// The engine refused the request.
    #[error("request rejected: {reason}")]
    Rejected {
        /// Why the request was refused.
        reason: String,
    },

    /// The operation requires an output created by `create_output`.
    #[error("no output has been created")]
    NoOutput,

    /// Error from the underlying audio library.
    #[error("audio backend error: {0}")]
    Backend(String),
}

impl EngineError {
    /// Creates a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Creates a rejection error with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Creates a device unavailable error with the given reason.
    pub fn device_unavailable(reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            reason: reason.into(),
        }
    }
}

/// A rejected submission.
///
/// The engine hands the buffer back so the session can return it to the
/// pool instead of leaking it.
#[derive(Debug)]
pub struct SubmitError {
    /// The buffer that was not queued.
    pub buffer: AudioBuffer,
    /// Why the engine refused it.
    pub error: EngineError,
}

impl SubmitError {
    /// Pairs a rejected buffer with the engine's error.
    pub fn new(buffer: AudioBuffer, error: EngineError) -> Self {
        Self { buffer, error }
    }
}

/// Buffer pool invariant violations.
///
/// None of these occur when buffers only move through
/// [`OutputSession`](crate::OutputSession) and
/// [`CompletionNotifier`](crate::CompletionNotifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// A buffer was requested while the free set was empty.
    #[error("buffer pool exhausted")]
    Exhausted,

    /// A buffer was released while already free.
    #[error("buffer {0} released twice")]
    DoubleRelease(BufferId),

    /// A buffer that does not belong to this pool was released.
    #[error("buffer {0} does not belong to this pool")]
    ForeignBuffer(BufferId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_display() {
        let err = OutputError::PayloadTooLarge {
            size: 5000,
            capacity: 4096,
        };
        assert_eq!(
            err.to_string(),
            "payload of 5000 bytes exceeds buffer capacity of 4096 bytes"
        );
    }

    #[test]
    fn test_engine_error_helpers() {
        assert_eq!(
            EngineError::backend("device lost").to_string(),
            "audio backend error: device lost"
        );
        assert_eq!(
            EngineError::rejected("queue full").to_string(),
            "request rejected: queue full"
        );
        assert_eq!(
            EngineError::device_unavailable("unplugged").to_string(),
            "device unavailable: unplugged"
        );
    }

    #[test]
    fn test_allocation_failed_keeps_source() {
        use std::error::Error;

        let err = OutputError::AllocationFailed {
            index: 2,
            count: 5,
            source: EngineError::backend("out of memory"),
        };
        assert!(err.to_string().contains("buffer 2 of 5"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_pool_error_converts_to_internal() {
        let err: OutputError = PoolError::Exhausted.into();
        assert!(matches!(err, OutputError::Internal(PoolError::Exhausted)));
    }
}
