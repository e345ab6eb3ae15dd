//! Audio format description and negotiation.
//!
//! This module provides:
//! - The logical payload format ([`AudioFormat`], [`SampleFormat`])
//! - The engine-native stream descriptor ([`StreamDescriptor`])
//! - Resolution from one to the other ([`FormatResolver`])
//!
//! No sample data is ever converted; payloads pass through as opaque bytes.

mod descriptor;
mod sample;

pub use descriptor::{FormatFlags, FormatResolver, LinearPcmResolver, StreamDescriptor};
pub use sample::{AudioFormat, SampleFormat};
