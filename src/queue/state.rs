//! Committed collection state shared between the worker and readers.
//!
//! The worker is the only writer. Readers take cheap `Arc` snapshots under a
//! short read lock, so they may see the previous commit while a unit is in
//! flight but never a half-applied one.

use crate::comparator::Comparator;
use crate::error::{Result, SourceError};
use crate::identity::IdentityIndex;
use crate::types::{Changes, SourceItem};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// One committed version of the collection.
pub(crate) struct Committed<T> {
    pub items: Arc<Vec<T>>,
    pub index: Arc<IdentityIndex>,
    pub comparator: Comparator<T>,
}

impl<T> Clone for Committed<T> {
    fn clone(&self) -> Self {
        Committed {
            items: Arc::clone(&self.items),
            index: Arc::clone(&self.index),
            comparator: self.comparator.clone(),
        }
    }
}

/// Committed state plus the change subscribers fed on every commit.
pub(crate) struct SharedState<T> {
    committed: RwLock<Committed<T>>,
    subscribers: Mutex<Vec<mpsc::Sender<Changes<T>>>>,
    subscriber_buffer: usize,
}

impl<T: SourceItem> SharedState<T> {
    pub fn new(comparator: Comparator<T>, subscriber_buffer: usize) -> Self {
        SharedState {
            committed: RwLock::new(Committed {
                items: Arc::new(Vec::new()),
                index: Arc::new(IdentityIndex::new()),
                comparator,
            }),
            subscribers: Mutex::new(Vec::new()),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    // ========== Reads ==========

    pub fn snapshot(&self) -> Committed<T> {
        self.committed.read().clone()
    }

    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.committed.read().items)
    }

    pub fn comparator(&self) -> Comparator<T> {
        self.committed.read().comparator.clone()
    }

    pub fn count(&self) -> usize {
        self.committed.read().items.len()
    }

    pub fn item_at(&self, index: usize) -> Result<T> {
        let committed = self.committed.read();
        committed
            .items
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::IndexOutOfRange {
                index,
                len: committed.items.len(),
            })
    }

    pub fn item(&self, uid: &str) -> Option<T> {
        let committed = self.committed.read();
        committed
            .index
            .position(uid)
            .and_then(|pos| committed.items.get(pos).cloned())
    }

    // ========== Worker side ==========

    /// Replace the committed sequence, and the comparator if one is given.
    pub fn commit(&self, sequence: Vec<T>, comparator: Option<Comparator<T>>) -> Arc<Vec<T>> {
        let index = Arc::new(IdentityIndex::build(&sequence));
        let items = Arc::new(sequence);

        let mut committed = self.committed.write();
        committed.items = Arc::clone(&items);
        committed.index = index;
        if let Some(comparator) = comparator {
            committed.comparator = comparator;
        }
        items
    }

    pub fn subscribe(&self) -> mpsc::Receiver<Changes<T>> {
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Offer `changes` to every subscriber, pruning the ones that went away.
    pub fn publish(&self, changes: &Changes<T>) {
        self.subscribers
            .lock()
            .retain(|sender| match sender.try_send(changes.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(kind = changes.kind.as_str(), "change subscriber is full, dropping batch");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
