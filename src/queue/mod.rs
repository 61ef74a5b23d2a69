//! The mutation queue: one worker, strict FIFO, injectable delivery.
//!
//! ```text
//! queue/
//! ├── config  - SourceConfig
//! ├── context - CompletionContext, Inline, ChannelContext/ContextRunner
//! ├── state   - committed sequence, identity index and comparator
//! └── worker  - the serial unit loop
//! ```
//!
//! Submitting never blocks: units go onto an unbounded channel drained by a
//! single tokio task. The committed state and the active comparator are only
//! ever written by that task.

mod config;
mod context;
pub(crate) mod state;
pub(crate) mod worker;

pub use config::SourceConfig;
pub use context::{channel_context, ChannelContext, CompletionContext, ContextRunner, Inline, Job};
