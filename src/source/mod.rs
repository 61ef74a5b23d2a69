//! The data source facade and its change subscriptions.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DataSource`] | Cloneable handle: committed reads and queued mutations |
//! | [`Subscription`] | Stream of committed [`Changes`](crate::Changes) batches |
//!
//! # Hooks
//!
//! Every mutation takes a `before` hook, run when its unit starts, and an
//! `after` hook, run once the result is committed. A list view adapter opens
//! its batch update in `before` and applies the index sets and closes the batch
//! in `after`:
//!
//! ```
//! use ordered_source::{DataSource, Item};
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ordered_source::Result<()> {
//! let source = DataSource::new()?;
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let (opened, applied) = (log.clone(), log.clone());
//! source.add(
//!     vec![Item::new("row", "r").with_sort_hint(1.0)],
//!     move || opened.lock().unwrap().push("begin".to_string()),
//!     move |result| {
//!         let changes = result.expect("add cannot fail here");
//!         applied.lock().unwrap().push(format!("insert {:?}", changes.insertions()));
//!     },
//! )?;
//!
//! // Units run in order, so waiting on a later one waits for this one too.
//! source.remove_and_wait(Vec::new()).await?;
//! assert_eq!(*log.lock().unwrap(), ["begin", "insert [0]"]);
//! # Ok(())
//! # }
//! ```

mod data_source;
mod subscription;

pub use data_source::DataSource;
pub use subscription::Subscription;
