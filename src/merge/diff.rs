//! Single-pass merge of a sorted batch into a sorted sequence.
//!
//! [`merge_diff`] walks the old sequence once, interleaving the pending
//! inserts by comparator order and skipping the pending removals, and records
//! every index it emits. A removal and an insertion of the same identity are
//! then collapsed into a reload when they land on the same index with the same
//! number of removals and insertions ahead of them, so the kept items on either
//! side still line up.
//!
//! # Index frames
//!
//! - removal indexes point into the old sequence
//! - insertion indexes point into the new sequence, valid when applied in
//!   ascending order after all removals
//! - reload indexes point into the new sequence
//!
//! # Examples
//!
//! ```
//! use ordered_source::merge::{apply, merge_diff};
//! use ordered_source::{Comparator, Item};
//!
//! let cmp = Comparator::by_sort_hint();
//! let old = vec![
//!     Item::new("A", "a").with_sort_hint(0.1),
//!     Item::new("B", "b").with_sort_hint(0.5),
//! ];
//! let inserts = vec![Item::new("C", "c").with_sort_hint(0.3)];
//!
//! let plan = merge_diff(&old, &[], &inserts, &cmp);
//! assert_eq!(plan.changes.insert, vec![1]);
//!
//! let merged = apply(&old, &plan);
//! let uids: Vec<_> = merged.iter().map(|i| i.uid.as_str()).collect();
//! assert_eq!(uids, ["a", "c", "b"]);
//! ```

use crate::comparator::Comparator;
use crate::types::{ChangeSet, SourceItem};
use std::collections::HashMap;

/// A computed diff plus the items it places.
#[derive(Debug, Clone)]
pub struct MergePlan<T> {
    /// Index operations
    pub changes: ChangeSet,
    /// Item for each entry of `changes.insert`, same order
    pub inserted: Vec<T>,
    /// Item for each entry of `changes.reload`, same order
    pub reloaded: Vec<T>,
}

impl<T> MergePlan<T> {
    /// A plan that changes nothing.
    pub fn empty() -> Self {
        MergePlan {
            changes: ChangeSet::default(),
            inserted: Vec::new(),
            reloaded: Vec::new(),
        }
    }
}

/// Where an operation was emitted: its index and how many operations of the
/// same kind precede it.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Emitted {
    index: usize,
    ordinal: usize,
}

/// Per-identity scratch entry correlating a removal with an insertion.
#[derive(Default)]
struct ChangeEntry {
    removed_at: Option<Emitted>,
    /// Insertion site plus position in the insert batch
    inserted_at: Option<(Emitted, usize)>,
}

/// Compute the edit operations that merge `inserts` into `old`.
///
/// `removals` lists ascending indexes of `old` to drop. `inserts` must be
/// sorted by `comparator` and must not share a key with any item of `old` that
/// is kept. `old` must be sorted by `comparator` too; unsorted input produces
/// an unspecified order, never a panic.
///
/// Runs in O(n + m) for `n = old.len()` and `m = inserts.len()`, plus sorting
/// the collapsed reloads.
pub fn merge_diff<T: SourceItem>(
    old: &[T],
    removals: &[usize],
    inserts: &[T],
    comparator: &Comparator<T>,
) -> MergePlan<T> {
    let mut remove = Vec::with_capacity(removals.len());
    let mut insert = Vec::with_capacity(inserts.len());
    let mut table: HashMap<&str, ChangeEntry> = HashMap::new();

    let mut pending_removals = removals.iter().copied().peekable();
    let mut pending_inserts = inserts.iter().enumerate().peekable();
    // net insertions minus removals emitted so far
    let mut offset: isize = 0;

    for (i, current) in old.iter().enumerate() {
        if pending_removals.next_if_eq(&i).is_some() {
            let site = Emitted { index: i, ordinal: remove.len() };
            remove.push(i);
            offset -= 1;
            table.entry(current.uid()).or_default().removed_at = Some(site);
            continue;
        }

        while let Some((k, candidate)) =
            pending_inserts.next_if(|(_, candidate)| comparator.less(candidate, current))
        {
            let site = Emitted { index: shifted(i, offset), ordinal: insert.len() };
            insert.push(site.index);
            offset += 1;
            table.entry(candidate.uid()).or_default().inserted_at = Some((site, k));
        }
    }

    for (k, candidate) in pending_inserts {
        let site = Emitted { index: shifted(old.len(), offset), ordinal: insert.len() };
        insert.push(site.index);
        offset += 1;
        table.entry(candidate.uid()).or_default().inserted_at = Some((site, k));
    }

    // Equal ordinals mean the same count of kept items precedes both sites.
    let mut reloads: Vec<(usize, usize)> = table
        .values()
        .filter_map(|entry| match (entry.removed_at, entry.inserted_at) {
            (Some(removed), Some((inserted, k))) if removed == inserted => {
                Some((removed.index, k))
            }
            _ => None,
        })
        .collect();
    reloads.sort_unstable();

    // Insert sites ascend with batch position, so both cursors below stay sorted.
    if !reloads.is_empty() {
        let mut collapsed = reloads.iter().map(|(at, _)| *at).peekable();
        remove.retain(|index| collapsed.next_if_eq(index).is_none());
        let mut collapsed = reloads.iter().map(|(at, _)| *at).peekable();
        insert.retain(|index| collapsed.next_if_eq(index).is_none());
    }

    let mut reloaded_slots = reloads.iter().map(|(_, k)| *k).peekable();
    let inserted = inserts
        .iter()
        .enumerate()
        .filter(|(k, _)| reloaded_slots.next_if_eq(k).is_none())
        .map(|(_, item)| item.clone())
        .collect();
    let reloaded = reloads.iter().map(|(_, k)| inserts[*k].clone()).collect();

    MergePlan {
        changes: ChangeSet {
            remove,
            insert,
            reload: reloads.into_iter().map(|(at, _)| at).collect(),
        },
        inserted,
        reloaded,
    }
}

/// Apply `plan` to `old`: removals, then insertions, then reloads.
pub fn apply<T: Clone>(old: &[T], plan: &MergePlan<T>) -> Vec<T> {
    let changes = &plan.changes;

    let mut removals = changes.remove.iter().copied().peekable();
    let mut kept = old
        .iter()
        .enumerate()
        .filter(|(i, _)| removals.next_if_eq(i).is_none())
        .map(|(_, item)| item);

    let len = old.len() + changes.insert.len() - changes.remove.len();
    let mut merged = Vec::with_capacity(len);
    let mut insertions = changes.insert.iter().copied().zip(plan.inserted.iter()).peekable();

    for at in 0..len {
        if let Some((_, item)) = insertions.next_if(|(index, _)| *index == at) {
            merged.push(item.clone());
        } else if let Some(item) = kept.next() {
            merged.push(item.clone());
        }
    }

    for (at, item) in changes.reload.iter().zip(plan.reloaded.iter()) {
        if let Some(slot) = merged.get_mut(*at) {
            *slot = item.clone();
        }
    }

    merged
}

#[inline]
fn shifted(index: usize, offset: isize) -> usize {
    index.saturating_add_signed(offset)
}
