//! The public data source handle.

use super::subscription::Subscription;
use crate::comparator::Comparator;
use crate::error::{Result, SourceError};
use crate::queue::state::SharedState;
use crate::queue::worker::{self, Mutation, Unit, UnitSender};
use crate::queue::{CompletionContext, Inline, SourceConfig};
use crate::types::{Changes, SourceItem};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// An ordered, identity-deduplicated collection with serialized mutations.
///
/// Reads (`count`, `item_at`, `item`, `items`) see the last committed
/// sequence. Mutations (`add`, `remove`, `reset`, `set_comparator`) are queued
/// and applied one at a time by a background worker; each reports back through
/// its hooks on the configured [`CompletionContext`].
///
/// Cloning creates another handle to the same collection. The worker stops
/// once every handle has been dropped and the queue has drained.
///
/// # Examples
///
/// ```
/// use ordered_source::{DataSource, Item};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ordered_source::Result<()> {
/// let source = DataSource::new()?;
/// source
///     .add_and_wait(vec![
///         Item::new("A", "a").with_sort_hint(0.1),
///         Item::new("B", "b").with_sort_hint(0.5),
///     ])
///     .await?;
///
/// let changes = source
///     .add_and_wait(vec![Item::new("C", "c").with_sort_hint(0.3)])
///     .await?;
/// assert_eq!(changes.insertions(), &[1]);
/// assert_eq!(source.to_string(), "[a, c, b]");
/// # Ok(())
/// # }
/// ```
pub struct DataSource<T: SourceItem> {
    state: Arc<SharedState<T>>,
    queue: UnitSender<T>,
}

impl<T: SourceItem> DataSource<T> {
    /// Create a data source ordered by sort hint, delivering hooks inline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::with_comparator(Comparator::by_sort_hint())
    }

    /// Create a data source with a custom comparator, delivering hooks inline.
    pub fn with_comparator(comparator: Comparator<T>) -> Result<Self> {
        Self::with_config(SourceConfig::default(), comparator, Inline)
    }

    /// Create a data source with explicit configuration and completion context.
    pub fn with_config(
        config: SourceConfig,
        comparator: Comparator<T>,
        context: impl CompletionContext,
    ) -> Result<Self> {
        let state = Arc::new(SharedState::new(comparator, config.subscriber_buffer));
        let queue = worker::spawn(Arc::clone(&state), Arc::new(context), config)?;
        Ok(DataSource { state, queue })
    }

    // ========== Committed Reads ==========

    /// Number of items in the committed sequence.
    pub fn count(&self) -> usize {
        self.state.count()
    }

    /// Whether the committed sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The item at `index` in the committed sequence.
    ///
    /// Fails with [`SourceError::IndexOutOfRange`] past the end.
    pub fn item_at(&self, index: usize) -> Result<T> {
        self.state.item_at(index)
    }

    /// The committed item whose identity key is exactly `uid`.
    pub fn item(&self, uid: &str) -> Option<T> {
        self.state.item(uid)
    }

    /// The whole committed sequence.
    pub fn items(&self) -> Arc<Vec<T>> {
        self.state.items()
    }

    /// The active comparator.
    pub fn comparator(&self) -> Comparator<T> {
        self.state.comparator()
    }

    /// Subscribe to every committed change batch from now on.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription::new(self.state.subscribe())
    }

    // ========== Mutations ==========

    /// Upsert `items`.
    ///
    /// Duplicate keys in the batch keep their first occurrence. An existing
    /// item with the same key is replaced; if the replacement lands on the same
    /// slot the change is reported as a reload instead of a remove plus insert.
    ///
    /// `before` runs when the unit starts; `after` receives the committed
    /// sequence with its removals, insertions and reloads.
    pub fn add<B, A>(&self, items: Vec<T>, before: B, after: A) -> Result<()>
    where
        B: FnOnce() + Send + 'static,
        A: FnOnce(Result<Changes<T>>) + Send + 'static,
    {
        self.submit(Mutation::Add(items), Some(Box::new(before)), Box::new(after))
    }

    /// Remove every item whose key appears in `items`; unknown keys are ignored.
    ///
    /// `after` receives the committed sequence and its removals.
    pub fn remove<B, A>(&self, items: Vec<T>, before: B, after: A) -> Result<()>
    where
        B: FnOnce() + Send + 'static,
        A: FnOnce(Result<Changes<T>>) + Send + 'static,
    {
        self.submit(Mutation::Remove(items), Some(Box::new(before)), Box::new(after))
    }

    /// Replace the whole collection with `items`.
    ///
    /// Every old index is removed and every new one inserted, even for keys
    /// present before and after; a reset never reports reloads.
    pub fn reset<B, A>(&self, items: Vec<T>, before: B, after: A) -> Result<()>
    where
        B: FnOnce() + Send + 'static,
        A: FnOnce(Result<Changes<T>>) + Send + 'static,
    {
        self.submit(Mutation::Reset(items), Some(Box::new(before)), Box::new(after))
    }

    /// Replace the comparator and re-sort the current contents under it.
    ///
    /// `on_applied` receives the re-sort as a remove-all/insert-all batch.
    pub fn set_comparator<A>(&self, comparator: Comparator<T>, on_applied: A) -> Result<()>
    where
        A: FnOnce(Result<Changes<T>>) + Send + 'static,
    {
        self.submit(Mutation::SetComparator(comparator), None, Box::new(on_applied))
    }

    /// [`add`](Self::add) and wait for the committed result.
    pub async fn add_and_wait(&self, items: Vec<T>) -> Result<Changes<T>> {
        self.submit_and_wait(Mutation::Add(items)).await
    }

    /// [`remove`](Self::remove) and wait for the committed result.
    pub async fn remove_and_wait(&self, items: Vec<T>) -> Result<Changes<T>> {
        self.submit_and_wait(Mutation::Remove(items)).await
    }

    /// [`reset`](Self::reset) and wait for the committed result.
    pub async fn reset_and_wait(&self, items: Vec<T>) -> Result<Changes<T>> {
        self.submit_and_wait(Mutation::Reset(items)).await
    }

    /// [`set_comparator`](Self::set_comparator) and wait for the re-sort.
    pub async fn set_comparator_and_wait(&self, comparator: Comparator<T>) -> Result<Changes<T>> {
        self.submit_and_wait(Mutation::SetComparator(comparator)).await
    }

    fn submit(
        &self,
        mutation: Mutation<T>,
        before: Option<worker::BeforeHook>,
        after: worker::AfterHook<T>,
    ) -> Result<()> {
        self.queue
            .send(Unit {
                mutation,
                before,
                after,
            })
            .map_err(|_| SourceError::WorkerGone)
    }

    async fn submit_and_wait(&self, mutation: Mutation<T>) -> Result<Changes<T>> {
        let (tx, rx) = oneshot::channel();
        self.submit(
            mutation,
            None,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )?;
        rx.await.map_err(|_| SourceError::WorkerGone)?
    }
}

impl<T: SourceItem> Clone for DataSource<T> {
    fn clone(&self) -> Self {
        DataSource {
            state: Arc::clone(&self.state),
            queue: self.queue.clone(),
        }
    }
}

impl<T: SourceItem> fmt::Display for DataSource<T> {
    /// Formats the committed identity keys, e.g. `[a, b, c]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items().iter().map(|item| DisplayUid(item.uid())))
            .finish()
    }
}

impl<T: SourceItem> fmt::Debug for DataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

struct DisplayUid<'a>(&'a str);

impl fmt::Debug for DisplayUid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
