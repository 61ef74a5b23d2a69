//! Batch planners for add, remove, reset and re-sort.
//!
//! Each planner is a pure function over a snapshot of the committed sequence.
//! The mutation worker runs them off the async threads and commits the
//! resulting sequence.

use super::diff::{apply, merge_diff};
use crate::comparator::Comparator;
use crate::error::{Result, SourceError};
use crate::identity::{dedup_by_uid, IdentityIndex};
use crate::types::{ChangeSet, SourceItem};

/// A planned mutation: the sequence to commit and the index operations that lead to it.
#[derive(Debug, Clone)]
pub struct Planned<T> {
    /// Sequence to commit
    pub sequence: Vec<T>,
    /// Operations turning the snapshot into `sequence`
    pub changes: ChangeSet,
}

/// Upsert `batch` into `current`.
///
/// Existing items sharing a key with the batch are replaced; a replacement that
/// keeps its slot is reported as a reload.
pub fn plan_add<T: SourceItem>(
    current: &[T],
    index: &IdentityIndex,
    batch: Vec<T>,
    comparator: &Comparator<T>,
) -> Planned<T> {
    let mut inserts = dedup_by_uid(batch);
    if inserts.is_empty() {
        return unchanged(current);
    }

    let removals = index.matching_positions(&inserts);
    comparator.sort(&mut inserts);

    let plan = merge_diff(current, &removals, &inserts, comparator);
    Planned {
        sequence: apply(current, &plan),
        changes: plan.changes,
    }
}

/// Remove every item of `current` whose key appears in `batch`.
pub fn plan_remove<T: SourceItem>(
    current: &[T],
    index: &IdentityIndex,
    batch: &[T],
    comparator: &Comparator<T>,
) -> Planned<T> {
    let removals = index.matching_positions(batch);
    if removals.is_empty() {
        return unchanged(current);
    }

    let plan = merge_diff(current, &removals, &[], comparator);
    Planned {
        sequence: apply(current, &plan),
        changes: plan.changes,
    }
}

/// Replace a sequence of `current_len` items with `batch`.
///
/// Every old index is removed and every new item inserted; identities that
/// survive the reset are not correlated, so no reloads are produced.
pub fn plan_reset<T: SourceItem>(
    current_len: usize,
    batch: Vec<T>,
    comparator: &Comparator<T>,
) -> Planned<T> {
    let mut sequence = dedup_by_uid(batch);
    comparator.sort(&mut sequence);

    let changes = ChangeSet {
        remove: (0..current_len).collect(),
        insert: (0..sequence.len()).collect(),
        reload: Vec::new(),
    };
    Planned { sequence, changes }
}

/// Re-sort `current` under a new comparator, reported as a reset against itself.
pub fn plan_resort<T: SourceItem>(current: &[T], comparator: &Comparator<T>) -> Planned<T> {
    plan_reset(current.len(), current.to_vec(), comparator)
}

/// Fail with [`SourceError::Unsorted`] unless `current` is ordered by `comparator`.
pub fn check_sorted<T>(current: &[T], comparator: &Comparator<T>) -> Result<()> {
    match comparator.first_unsorted(current) {
        Some(index) => Err(SourceError::Unsorted { index }),
        None => Ok(()),
    }
}

fn unchanged<T: Clone>(current: &[T]) -> Planned<T> {
    Planned {
        sequence: current.to_vec(),
        changes: ChangeSet::default(),
    }
}
