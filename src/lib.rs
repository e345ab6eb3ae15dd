//! # queued-audio-out
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Buffered audio output with a fixed buffer pool and blocking writes.
//!
//! `queued-audio-out` sits between a producer that writes raw PCM bytes and
//! a playback engine that consumes whole buffers asynchronously. A fixed
//! pool of N buffers circulates between the two, and `write()` blocks while
//! all N are queued, so the producer is paced by the hardware's actual
//! playback rate.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use queued_audio_out::{AudioFormat, CpalEngine, OutputSession};
//!
//! let engine = CpalEngine::open_default()?;
//! let mut session = OutputSession::builder(engine)
//!     .on_event(|e| tracing::warn!(?e, "output event"))
//!     .build();
//!
//! session.open(&AudioFormat::cd_quality(), 4, 4096)?;
//! session.play()?;
//!
//! for chunk in pcm.chunks(4096) {
//!     session.write(chunk)?; // blocks while all 4 buffers are queued
//! }
//!
//! session.close()?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Producer thread**: calls `write()`, blocks on the flow controller
//! - **Engine thread**: plays buffers and hands them back through a
//!   [`CompletionNotifier`], which never blocks for longer than a pool update
//! - **Buffer pool**: the only state the two threads share, behind one lock
//!
//! In-flight buffers never exceed N, and every buffer is always either free
//! or in flight.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
pub mod engine;
mod error;
mod event;
pub mod format;
pub mod pool;
mod session;

pub use builder::OutputSessionBuilder;
pub use config::{BufferControl, OutputConfig};
pub use engine::{
    default_output_device_name, list_output_devices, CpalEngine, MockEngine, MockEngineHandle,
    OutputEngine,
};
pub use error::{EngineError, OutputError, PoolError, SubmitError};
pub use event::{event_callback, EventCallback, OutputEvent};
pub use format::{AudioFormat, FormatResolver, LinearPcmResolver, SampleFormat, StreamDescriptor};
pub use pool::{AudioBuffer, BufferId, BufferPool, CompletionNotifier, FlowController};
pub use session::{OutputSession, OutputStats, SessionState};
