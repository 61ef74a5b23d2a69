//! Core data types: items, change sets and delivered changes.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SourceItem`] | Trait for anything with a stable identity key |
//! | [`Item`] | Stock item: payload, key and optional sort hint |
//! | [`GenericItem`] | Payload wrapped with caller-supplied key and hint extractors |
//! | [`ChangeSet`] | Remove/insert/reload index lists of one mutation |
//! | [`Changes`] | Committed sequence plus the change set that produced it |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An item that can live in an ordered data source.
///
/// Identity is the exact string value returned by [`uid`](SourceItem::uid). Two
/// items with the same key are the same entity: adding the second one replaces
/// the first.
pub trait SourceItem: Clone + Send + Sync + 'static {
    /// Stable identity key of this item.
    fn uid(&self) -> &str;

    /// Optional numeric ordering hint, used by [`Comparator::by_sort_hint`](crate::Comparator::by_sort_hint).
    fn sort_hint(&self) -> Option<f64> {
        None
    }
}

/// The stock item type: an opaque payload with an identity key and an optional sort hint.
///
/// # Examples
///
/// ```
/// use ordered_source::{Item, SourceItem};
///
/// let item = Item::new("Title: 0.2500", "0.2500").with_sort_hint(0.25);
/// assert_eq!(item.uid(), "0.2500");
/// assert_eq!(item.sort_hint(), Some(0.25));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<V> {
    /// Payload
    pub value: V,
    /// Identity key
    pub uid: String,
    /// Ordering hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_hint: Option<f64>,
}

impl<V> Item<V> {
    /// Create an item without a sort hint.
    pub fn new(value: V, uid: impl Into<String>) -> Self {
        Item {
            value,
            uid: uid.into(),
            sort_hint: None,
        }
    }

    /// Set the sort hint.
    #[must_use]
    pub fn with_sort_hint(mut self, hint: f64) -> Self {
        self.sort_hint = Some(hint);
        self
    }

    /// A new item with the same identity and sort hint but a different payload.
    ///
    /// This is how a single row is refreshed: adding the result yields a reload.
    #[must_use]
    pub fn refreshed(&self, value: V) -> Self {
        Item {
            value,
            uid: self.uid.clone(),
            sort_hint: self.sort_hint,
        }
    }
}

impl<V> SourceItem for Item<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn uid(&self) -> &str {
        &self.uid
    }

    fn sort_hint(&self) -> Option<f64> {
        self.sort_hint
    }
}

impl<V> fmt::Display for Item<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}

/// A payload whose key and hint are derived from the payload itself.
///
/// The extractors run once at construction, so the item stays an immutable
/// snapshot even if they are not pure.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericItem<V> {
    value: V,
    uid: String,
    sort_hint: Option<f64>,
}

impl<V> GenericItem<V> {
    /// Wrap `value`, deriving its identity key.
    pub fn new(value: V, uid: impl FnOnce(&V) -> String) -> Self {
        let uid = uid(&value);
        GenericItem {
            value,
            uid,
            sort_hint: None,
        }
    }

    /// Wrap `value`, deriving both its identity key and its sort hint.
    pub fn with_hint(
        value: V,
        uid: impl FnOnce(&V) -> String,
        hint: impl FnOnce(&V) -> f64,
    ) -> Self {
        let uid = uid(&value);
        let sort_hint = Some(hint(&value));
        GenericItem {
            value,
            uid,
            sort_hint,
        }
    }

    /// The wrapped payload.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Unwrap the payload.
    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V> SourceItem for GenericItem<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn uid(&self) -> &str {
        &self.uid
    }

    fn sort_hint(&self) -> Option<f64> {
        self.sort_hint
    }
}

impl<V> fmt::Display for GenericItem<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}

/// Index-level edit operations produced by one mutation.
///
/// All three lists are ascending and pairwise disjoint in index space.
///
/// - `remove` indexes refer to the sequence before the mutation.
/// - `insert` indexes refer to the sequence after the mutation; applied in
///   ascending order once removals are done.
/// - `reload` indexes refer to the sequence after the mutation; the item at
///   that position kept its identity and slot but has new content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Removed positions, old frame
    pub remove: Vec<usize>,
    /// Inserted positions, new frame
    pub insert: Vec<usize>,
    /// Reloaded positions, new frame
    pub reload: Vec<usize>,
}

impl ChangeSet {
    /// Whether the mutation changed nothing.
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.insert.is_empty() && self.reload.is_empty()
    }

    /// Total number of index operations.
    pub fn len(&self) -> usize {
        self.remove.len() + self.insert.len() + self.reload.len()
    }
}

/// Which operation produced a [`Changes`] batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Upsert of a batch
    Add,
    /// Removal of a batch
    Remove,
    /// Replacement of the whole sequence
    Reset,
    /// Re-sort after a comparator change
    Resort,
}

impl MutationKind {
    /// Short lowercase name, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Add => "add",
            MutationKind::Remove => "remove",
            MutationKind::Reset => "reset",
            MutationKind::Resort => "resort",
        }
    }
}

/// The outcome of a committed mutation unit.
#[derive(Debug, Clone)]
pub struct Changes<T> {
    /// Which operation ran
    pub kind: MutationKind,
    /// The committed sequence after the mutation
    pub sequence: Arc<Vec<T>>,
    /// Index operations that turn the previous sequence into `sequence`
    pub changes: ChangeSet,
}

impl<T> Changes<T> {
    /// Removed positions in the previous sequence.
    pub fn removals(&self) -> &[usize] {
        &self.changes.remove
    }

    /// Inserted positions in the new sequence.
    pub fn insertions(&self) -> &[usize] {
        &self.changes.insert
    }

    /// Reloaded positions in the new sequence.
    pub fn reloads(&self) -> &[usize] {
        &self.changes.reload
    }
}
