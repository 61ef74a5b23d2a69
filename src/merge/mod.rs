//! Merge-diff engine: sorted merges, index operations and batch planning.
//!
//! Given a sorted sequence and a sorted incoming batch, the engine produces the
//! index-level operations a list view needs to animate the change, collapsing
//! a removal and an insertion of the same identity at the same slot into a
//! single reload.
//!
//! # Key Types
//!
//! | Item | Description |
//! |------|-------------|
//! | [`merge_diff`] | Single-pass merge producing a [`MergePlan`] |
//! | [`apply`] | Applies a plan to the old sequence |
//! | [`plan_add`] / [`plan_remove`] / [`plan_reset`] / [`plan_resort`] | Batch planners |
//!
//! # Examples
//!
//! ## Refreshing one row
//!
//! ```
//! use ordered_source::merge::plan_add;
//! use ordered_source::identity::IdentityIndex;
//! use ordered_source::{Comparator, Item};
//!
//! let current = vec![Item::new("old", "x").with_sort_hint(0.2)];
//! let index = IdentityIndex::build(&current);
//! let fresh = Item::new("new", "x").with_sort_hint(0.2);
//!
//! let planned = plan_add(&current, &index, vec![fresh], &Comparator::by_sort_hint());
//! assert_eq!(planned.changes.reload, vec![0]);
//! assert_eq!(planned.sequence[0].value, "new");
//! ```

pub mod batch;
pub mod diff;

pub use batch::{check_sorted, plan_add, plan_remove, plan_reset, plan_resort, Planned};
pub use diff::{apply, merge_diff, MergePlan};
