#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Ordered Source: sorted collections that explain their changes
//!
//! This crate keeps an ordered, identity-deduplicated collection of items and,
//! for every mutation, computes the remove/insert/reload index operations that
//! turn the previous sequence into the new one. Mutations are serialized through
//! a single background worker so list views receive consistent, race-free
//! update batches.
//!
//! ## Overview
//!
//! 1. **Comparator** - pluggable total order, swappable at runtime
//! 2. **Identity Index** - exact-key lookups and batch deduplication
//! 3. **Merge-Diff** - single-pass merge of a sorted batch with reload collapsing
//! 4. **Mutation Queue** - one worker, FIFO, hooks delivered on an injectable context
//! 5. **Data Source** - the public handle over all of the above
//!
//! ## Key Features
//!
//! - **Upserts**: adding an item whose key already exists replaces it
//! - **Reloads**: a replacement that keeps its slot is reported as a reload
//! - **Ordered delivery**: hooks fire in submission order
//! - **Panic isolation**: a panicking comparator fails only its own unit
//! - **Subscriptions**: a `Stream` of every committed batch
//!
//! ## Usage
//!
//! ```
//! use ordered_source::{DataSource, Item};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ordered_source::Result<()> {
//! let source = DataSource::new()?;
//! source
//!     .add_and_wait(vec![Item::new("Title: 0.2000", "x").with_sort_hint(0.2)])
//!     .await?;
//!
//! // Refresh the row: same key, same position, new payload.
//! let changes = source
//!     .add_and_wait(vec![Item::new("Title: 0.9000", "x").with_sort_hint(0.2)])
//!     .await?;
//! assert_eq!(changes.reloads(), &[0]);
//! assert_eq!(source.item("x").unwrap().value, "Title: 0.9000");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Items, change sets and delivered changes
//! - **[error]** - Error types and result handling
//! - **[comparator]** - Pluggable orderings
//! - **[identity]** - Identity index and batch deduplication
//! - **[merge]** - Merge-diff algorithm and batch planners
//! - **[queue]** - Mutation worker, configuration and completion contexts
//! - **[source]** - The `DataSource` facade and subscriptions

pub mod comparator;
pub mod error;
pub mod identity;
pub mod merge;
pub mod queue;
pub mod source;
pub mod types;

pub use comparator::Comparator;
pub use error::{Result, SourceError};
pub use queue::{channel_context, ChannelContext, CompletionContext, ContextRunner, Inline, SourceConfig};
pub use source::{DataSource, Subscription};
pub use types::{ChangeSet, Changes, GenericItem, Item, MutationKind, SourceItem};

#[cfg(test)]
mod tests;
