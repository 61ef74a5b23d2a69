//! Identity index: identity key to position lookups.
//!
//! Keys are compared as exact strings. Two different keys never alias, even
//! if their hashes collide.

use crate::types::SourceItem;
use std::collections::{HashMap, HashSet};

/// Maps each item's identity key to its position in a sequence.
///
/// Built once per committed sequence and shared read-only with readers.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    positions: HashMap<String, usize>,
}

impl IdentityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every item of `items` by its key.
    ///
    /// If keys repeat, the last position wins; committed sequences never repeat.
    pub fn build<T: SourceItem>(items: &[T]) -> Self {
        let positions = items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.uid().to_string(), pos))
            .collect();
        IdentityIndex { positions }
    }

    /// Position of the item with key `uid`.
    pub fn position(&self, uid: &str) -> Option<usize> {
        self.positions.get(uid).copied()
    }

    /// Whether an item with key `uid` is indexed.
    pub fn contains(&self, uid: &str) -> bool {
        self.positions.contains_key(uid)
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Ascending positions of indexed items whose key matches an item of `batch`.
    ///
    /// Batch items that are not indexed are skipped; repeated keys are reported once.
    pub fn matching_positions<T: SourceItem>(&self, batch: &[T]) -> Vec<usize> {
        let mut found: Vec<usize> = batch
            .iter()
            .filter_map(|item| self.position(item.uid()))
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }
}

/// Drop later items whose key already appeared in `batch`; first occurrence wins.
pub fn dedup_by_uid<T: SourceItem>(batch: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(batch.len());
    batch
        .into_iter()
        .filter(|item| seen.insert(item.uid().to_string()))
        .collect()
}
