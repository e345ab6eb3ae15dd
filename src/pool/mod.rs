//! Buffer pool components.
//!
//! Buffers circulate between the producer and the engine:
//!
//! ```text
//! write() → FlowController → BufferPool::acquire → fill → engine.submit
//!    ↑                                                        │
//!    └── FlowController::release_slot ← BufferPool::release ← CompletionNotifier
//! ```
//!
//! - **Buffer**: move-only byte region; ownership is the handoff
//! - **Pool**: slot arena plus FIFO free queue, behind one mutex
//! - **Flow controller**: counting gate that makes `write()` block
//! - **Notifier**: the engine's way back into the pool

mod buffer;
mod flow;
mod notifier;
mod slots;

pub use buffer::{AudioBuffer, BufferId};
pub use flow::FlowController;
pub use notifier::CompletionNotifier;
pub use slots::BufferPool;

pub(crate) use notifier::SharedPool;
