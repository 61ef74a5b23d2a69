//! Pluggable total order over items.
//!
//! A [`Comparator`] is a cheaply cloneable strategy object. The data source
//! captures the active comparator when a mutation unit starts, so replacing it
//! only affects units that run after the replacement.

use crate::types::SourceItem;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type CompareFn<T> = dyn Fn(&T, &T) -> Ordering + Send + Sync;

/// Total order over two items.
///
/// "Sorts strictly before" means [`Ordering::Less`]. Items that compare
/// [`Ordering::Equal`] keep their relative order when sorted, and an incoming
/// item equal to an existing one lands after it.
///
/// # Examples
///
/// ```
/// use ordered_source::{Comparator, Item};
/// use std::cmp::Ordering;
///
/// let by_title = Comparator::by_key(|item: &Item<&'static str>| item.value);
/// let a = Item::new("apple", "1");
/// let b = Item::new("banana", "2");
/// assert_eq!(by_title.compare(&a, &b), Ordering::Less);
/// assert!(by_title.reversed().less(&b, &a));
/// ```
pub struct Comparator<T> {
    compare: Arc<CompareFn<T>>,
}

impl<T> Comparator<T> {
    /// Build a comparator from an ordering function.
    pub fn new(compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        Comparator {
            compare: Arc::new(compare),
        }
    }

    /// Order items by a derived key.
    pub fn by_key<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::new(move |a, b| key(a).cmp(&key(b)))
    }

    /// Compare two items.
    #[inline]
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.compare)(a, b)
    }

    /// Whether `a` sorts strictly before `b`.
    #[inline]
    pub fn less(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// The same order, descending.
    #[must_use]
    pub fn reversed(&self) -> Self
    where
        T: 'static,
    {
        let inner = Arc::clone(&self.compare);
        Comparator {
            compare: Arc::new(move |a, b| inner(b, a)),
        }
    }

    /// Stable-sort `items` in place.
    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// First index whose item sorts strictly before its predecessor.
    pub fn first_unsorted(&self, items: &[T]) -> Option<usize> {
        items
            .windows(2)
            .position(|pair| self.less(&pair[1], &pair[0]))
            .map(|pos| pos + 1)
    }
}

impl<T: SourceItem> Comparator<T> {
    /// Ascending by [`SourceItem::sort_hint`]; items without a hint sort first.
    ///
    /// Hints are compared with [`f64::total_cmp`], so NaN is ordered instead of
    /// breaking the total order.
    pub fn by_sort_hint() -> Self {
        Self::new(|a: &T, b: &T| match (a.sort_hint(), b.sort_hint()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

impl<T: SourceItem> Default for Comparator<T> {
    fn default() -> Self {
        Self::by_sort_hint()
    }
}

impl<T> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        Comparator {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for Comparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator").finish_non_exhaustive()
    }
}
