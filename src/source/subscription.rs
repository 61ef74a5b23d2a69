//! Change subscriptions.
//!
//! A [`Subscription`] receives every committed [`Changes`] batch in commit
//! order, independent of the per-call hooks. View adapters that prefer pulling
//! updates can drive their redraws from it instead of from `after` hooks.
//!
//! # Examples
//!
//! ```
//! use ordered_source::{DataSource, Item};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ordered_source::Result<()> {
//! let source = DataSource::<Item<&'static str>>::new()?;
//! let mut updates = source.subscribe();
//!
//! source.add_and_wait(vec![Item::new("hello", "h")]).await?;
//!
//! let changes = updates.next().await.expect("source is alive");
//! assert_eq!(changes.insertions(), &[0]);
//! # Ok(())
//! # }
//! ```

use crate::types::Changes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// A stream of committed change batches.
///
/// The stream ends once the data source's worker has stopped. If the consumer
/// lags by more than `SourceConfig::subscriber_buffer` batches, newer batches
/// are dropped until it catches up.
pub struct Subscription<T> {
    receiver: ReceiverStream<Changes<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<Changes<T>>) -> Self {
        Subscription {
            receiver: ReceiverStream::new(receiver),
        }
    }

    /// Receive the next committed batch, or `None` once the source is gone.
    pub async fn next(&mut self) -> Option<Changes<T>> {
        StreamExt::next(&mut self.receiver).await
    }

    /// Take an already committed batch without waiting.
    pub fn try_next(&mut self) -> Option<Changes<T>> {
        self.receiver.as_mut().try_recv().ok()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Changes<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
