//! Ordered set with O(1) membership and O(1) position lookup
//!
//! Representation:
//! - `array`: the ordered sequence, source of truth for order
//! - `set`: membership
//! - `indexes`: element -> current position in `array`
//!
//! After every public call returns, `set` holds exactly the elements of
//! `array`, `indexes[e]` is the position of `e` in `array`, and `array` has no
//! duplicates. Structural changes re-index only the suffix that moved.

use std::cmp;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::RandomState;
use tracing::trace;

use crate::error::{Error, Result};

/// Comparator used by [`OrderingMode::Sorted`]
pub type Comparator<E> = Arc<dyn Fn(&E, &E) -> cmp::Ordering + Send + Sync>;

/// How an [`OrderedSet`] places new elements
pub enum OrderingMode<E> {
    /// New and updated elements go to the tail
    Temporal,

    /// The sequence stays sorted by the comparator after every change
    Sorted(Comparator<E>),
}

impl<E> OrderingMode<E> {
    /// Sorted mode from a plain comparison function
    pub fn sorted_by<F>(compare: F) -> Self
    where
        F: Fn(&E, &E) -> cmp::Ordering + Send + Sync + 'static,
    {
        OrderingMode::Sorted(Arc::new(compare))
    }

    /// Sorted mode using the element's natural order
    pub fn natural() -> Self
    where
        E: Ord + 'static,
    {
        Self::sorted_by(E::cmp)
    }

    /// Whether this is the sorted mode
    pub fn is_sorted(&self) -> bool {
        matches!(self, OrderingMode::Sorted(_))
    }
}

impl<E> Clone for OrderingMode<E> {
    fn clone(&self) -> Self {
        match self {
            OrderingMode::Temporal => OrderingMode::Temporal,
            OrderingMode::Sorted(compare) => OrderingMode::Sorted(Arc::clone(compare)),
        }
    }
}

impl<E> Default for OrderingMode<E> {
    fn default() -> Self {
        OrderingMode::Temporal
    }
}

impl<E> fmt::Debug for OrderingMode<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingMode::Temporal => f.write_str("Temporal"),
            OrderingMode::Sorted(_) => f.write_str("Sorted"),
        }
    }
}

/// Unique-element sequence with hash-based membership and position lookup
///
/// Not synchronized; see
/// [`ConcurrentOrderedSet`](crate::concurrent_set::ConcurrentOrderedSet) for
/// the lock-protected variant with the same algorithm.
pub struct OrderedSet<E> {
    set: HashSet<E, RandomState>,
    array: Vec<E>,
    indexes: HashMap<E, usize, RandomState>,
    ordering: OrderingMode<E>,
}

impl<E> OrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    /// Create an empty set in temporal mode
    pub fn new() -> Self {
        Self::with_ordering(OrderingMode::Temporal)
    }

    /// Create an empty set with the given ordering mode
    pub fn with_ordering(ordering: OrderingMode<E>) -> Self {
        Self {
            set: HashSet::with_hasher(RandomState::new()),
            array: Vec::new(),
            indexes: HashMap::with_hasher(RandomState::new()),
            ordering,
        }
    }

    /// Create a set from a sequence; later duplicates are dropped
    pub fn from_sequence<I>(items: I, ordering: OrderingMode<E>) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        let mut set = Self::with_ordering(ordering);
        set.extend(items);
        set
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Membership test, O(1)
    pub fn contains(&self, element: &E) -> bool {
        self.set.contains(element)
    }

    /// Position of `element` in the sequence, O(1)
    pub fn index_of(&self, element: &E) -> Option<usize> {
        self.indexes.get(element).copied()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&E> {
        self.array.get(index)
    }

    /// Head of the sequence
    pub fn first(&self) -> Option<&E> {
        self.array.first()
    }

    /// Tail of the sequence
    pub fn last(&self) -> Option<&E> {
        self.array.last()
    }

    /// The ordered sequence
    pub fn as_slice(&self) -> &[E] {
        &self.array
    }

    /// Iterate in sequence order
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.array.iter()
    }

    /// Current ordering mode
    pub fn ordering(&self) -> &OrderingMode<E> {
        &self.ordering
    }

    /// Insert `element` if absent
    ///
    /// Temporal mode pushes it to the tail; sorted mode places it after
    /// every element that does not compare greater.
    ///
    /// # Returns
    /// * `bool` - true if the element was inserted, false if already present
    pub fn append(&mut self, element: E) -> bool {
        if self.set.contains(&element) {
            return false;
        }

        let position = match &self.ordering {
            OrderingMode::Temporal => self.array.len(),
            OrderingMode::Sorted(compare) => self
                .array
                .partition_point(|existing| compare(existing, &element) != cmp::Ordering::Greater),
        };
        self.set.insert(element.clone());
        self.array.insert(position, element);
        self.reindex_from(position);

        debug_assert!(self.is_consistent());
        true
    }

    /// Place `element` at `index`, moving it there if it is already present
    ///
    /// `index` is interpreted after any existing copy has been removed, so it
    /// may be at most `len()` (or `len() - 1` when moving an existing element).
    ///
    /// # Errors
    /// * `Error::SortedInsert` - the set is in sorted mode
    /// * `Error::IndexOutOfBounds` - `index` is past the end; nothing changes
    pub fn insert(&mut self, element: E, index: usize) -> Result<()> {
        if self.ordering.is_sorted() {
            return Err(Error::SortedInsert);
        }

        let len_after_removal = self.array.len() - usize::from(self.set.contains(&element));
        if index > len_after_removal {
            return Err(Error::IndexOutOfBounds {
                index,
                len: len_after_removal,
            });
        }

        let start = match self.indexes.get(&element).copied() {
            Some(old) => {
                self.array.remove(old);
                old.min(index)
            }
            None => {
                self.set.insert(element.clone());
                index
            }
        };
        self.array.insert(index, element);
        self.reindex_from(start);

        debug_assert!(self.is_consistent());
        Ok(())
    }

    /// Remove `element`
    ///
    /// # Returns
    /// * `Option<E>` - the stored instance, or `None` if it was not a member
    pub fn remove(&mut self, element: &E) -> Option<E> {
        let position = self.indexes.remove(element)?;
        self.set.remove(element);
        let removed = self.array.remove(position);
        self.reindex_from(position);

        debug_assert!(self.is_consistent());
        Some(removed)
    }

    /// Remove the element at `index`
    pub fn remove_at(&mut self, index: usize) -> Option<E> {
        if index >= self.array.len() {
            return None;
        }
        let removed = self.array.remove(index);
        self.untrack(&removed);
        self.reindex_from(index);

        debug_assert!(self.is_consistent());
        Some(removed)
    }

    /// Pop the head of the sequence
    pub fn remove_first(&mut self) -> Option<E> {
        self.remove_at(0)
    }

    /// Pop the tail of the sequence; only its own mapping goes stale
    pub fn remove_last(&mut self) -> Option<E> {
        let removed = self.array.pop()?;
        self.untrack(&removed);

        debug_assert!(self.is_consistent());
        Some(removed)
    }

    /// Replace any equal element and re-append, refreshing its position
    ///
    /// In temporal mode this moves the element to the tail.
    ///
    /// # Returns
    /// * `Option<E>` - the previously stored equal element, if any
    pub fn update(&mut self, element: E) -> Option<E> {
        let previous = self.remove(&element);
        self.append(element);
        previous
    }

    /// Remove every element
    pub fn clear(&mut self) {
        self.set.clear();
        self.array.clear();
        self.indexes.clear();
    }

    /// Keep only the elements for which `keep` returns true, preserving order
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&E) -> bool,
    {
        let before = self.array.len();
        let (set, indexes) = (&mut self.set, &mut self.indexes);
        self.array.retain(|element| {
            let kept = keep(element);
            if !kept {
                set.remove(element);
                indexes.remove(element);
            }
            kept
        });

        if self.array.len() != before {
            self.reindex_from(0);
        }
        debug_assert!(self.is_consistent());
    }

    /// Switch the ordering mode
    ///
    /// Temporal to sorted sorts immediately; sorted to sorted re-sorts with
    /// the new comparator.
    ///
    /// # Errors
    /// * `Error::OrderingLocked` - sorted to temporal; the original insertion
    ///   order is gone once a sort has been imposed
    pub fn set_ordering(&mut self, ordering: OrderingMode<E>) -> Result<()> {
        match (&self.ordering, ordering) {
            (OrderingMode::Sorted(_), OrderingMode::Temporal) => Err(Error::OrderingLocked),
            (OrderingMode::Temporal, OrderingMode::Temporal) => Ok(()),
            (_, sorted) => {
                self.ordering = sorted;
                self.resort();
                Ok(())
            }
        }
    }

    /// Impose a sort order; shorthand for [`set_ordering`](Self::set_ordering)
    /// with [`OrderingMode::sorted_by`]
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: Fn(&E, &E) -> cmp::Ordering + Send + Sync + 'static,
    {
        self.ordering = OrderingMode::sorted_by(compare);
        self.resort();
    }

    /// Elements of `self` followed by the elements of `other` not in `self`
    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.extend(other.iter().cloned());
        result
    }

    /// Elements of `self` that are also in `other`, in `self`'s order
    pub fn intersection(&self, other: &Self) -> Self {
        self.filtered(|element| other.contains(element))
    }

    /// Elements of `self` that are not in `other`, in `self`'s order
    pub fn subtracting(&self, other: &Self) -> Self {
        self.filtered(|element| !other.contains(element))
    }

    /// Elements in exactly one operand: `self`'s first, then `other`'s
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        let mut result = self.subtracting(other);
        result.extend(other.iter().filter(|e| !self.contains(e)).cloned());
        result
    }

    /// Every element of `self` is in `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|e| other.contains(e))
    }

    /// Every element of `other` is in `self`
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// No element is shared
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.iter().all(|e| !other.contains(e))
    }

    /// Check the representation invariant
    ///
    /// True when `array`, `set` and `indexes` agree in size, every element's
    /// recorded position points back at it, and no element repeats.
    pub fn is_consistent(&self) -> bool {
        self.array.len() == self.set.len()
            && self.array.len() == self.indexes.len()
            && self.array.iter().enumerate().all(|(position, element)| {
                self.set.contains(element) && self.indexes.get(element) == Some(&position)
            })
    }

    fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&E) -> bool,
    {
        let mut result = Self::with_ordering(self.ordering.clone());
        for element in self.iter().filter(|e| keep(e)) {
            let position = result.array.len();
            result.track(element.clone(), position);
            result.array.push(element.clone());
        }
        result
    }

    fn track(&mut self, element: E, position: usize) {
        self.set.insert(element.clone());
        self.indexes.insert(element, position);
    }

    fn untrack(&mut self, element: &E) {
        self.set.remove(element);
        self.indexes.remove(element);
    }

    /// Rewrite positions for `array[start..]`
    fn reindex_from(&mut self, start: usize) {
        for (offset, element) in self.array[start..].iter().enumerate() {
            let position = start + offset;
            match self.indexes.get_mut(element) {
                Some(slot) => *slot = position,
                None => {
                    self.indexes.insert(element.clone(), position);
                }
            }
        }
    }

    fn resort(&mut self) {
        if let OrderingMode::Sorted(compare) = &self.ordering {
            trace!(len = self.array.len(), "re-sorting ordered set");
            let compare = Arc::clone(compare);
            self.array.sort_by(|a, b| compare(a, b));
            self.reindex_from(0);
        }
        debug_assert!(self.is_consistent());
    }
}

impl<E> Clone for OrderedSet<E>
where
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
            array: self.array.clone(),
            indexes: self.indexes.clone(),
            ordering: self.ordering.clone(),
        }
    }
}

impl<E> Default for OrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Equal iff the sequences are equal element-wise, in order
impl<E: PartialEq> PartialEq for OrderedSet<E> {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array
    }
}

impl<E: Eq> Eq for OrderedSet<E> {}

impl<E: Hash> Hash for OrderedSet<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.array.hash(state);
    }
}

impl<E: fmt::Debug> fmt::Debug for OrderedSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.array.iter()).finish()
    }
}

impl<E> FromIterator<E> for OrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from_sequence(iter, OrderingMode::Temporal)
    }
}

impl<E> Extend<E> for OrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for element in iter {
            self.append(element);
        }
    }
}

impl<E> IntoIterator for OrderedSet<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.array.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a OrderedSet<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.array.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporal(items: &[i32]) -> OrderedSet<i32> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_append_temporal() {
        let mut set = OrderedSet::new();
        assert!(set.append("a"));
        assert!(set.append("b"));
        assert!(set.append("c"));

        assert_eq!(set.as_slice(), &["a", "b", "c"]);
        assert_eq!(set.index_of(&"c"), Some(2));
        assert!(set.is_consistent());
    }

    #[test]
    fn test_append_idempotent() {
        let mut set = temporal(&[1, 2, 3]);
        let before = set.clone();

        assert!(!set.append(2));
        assert_eq!(set, before);
        assert_eq!(set.index_of(&2), Some(1));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_append_sorted() {
        let mut set = OrderedSet::with_ordering(OrderingMode::natural());
        for n in [5, 1, 4, 2, 3] {
            set.append(n);
        }

        assert_eq!(set.as_slice(), &[1, 2, 3, 4, 5]);
        for (i, n) in set.iter().enumerate() {
            assert_eq!(set.index_of(n), Some(i));
        }
    }

    #[test]
    fn test_sorted_custom_comparator() {
        let mut set =
            OrderedSet::with_ordering(OrderingMode::sorted_by(|a: &i32, b: &i32| b.cmp(a)));
        set.extend([2, 9, 4]);
        assert_eq!(set.as_slice(), &[9, 4, 2]);
    }

    #[test]
    fn test_insert_new_at_index() {
        let mut set = temporal(&[1, 2, 3]);
        set.insert(9, 1).unwrap();

        assert_eq!(set.as_slice(), &[1, 9, 2, 3]);
        assert_eq!(set.index_of(&3), Some(3));
        assert!(set.is_consistent());
    }

    #[test]
    fn test_insert_moves_existing() {
        let mut set = temporal(&[1, 2, 3, 4]);
        set.insert(4, 0).unwrap();
        assert_eq!(set.as_slice(), &[4, 1, 2, 3]);

        set.insert(4, 3).unwrap();
        assert_eq!(set.as_slice(), &[1, 2, 3, 4]);
        assert!(set.is_consistent());
    }

    #[test]
    fn test_insert_rejected_in_sorted_mode() {
        let mut set = OrderedSet::with_ordering(OrderingMode::natural());
        set.append(1);
        assert_eq!(set.insert(0, 0), Err(Error::SortedInsert));
        assert_eq!(set.as_slice(), &[1]);
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut set = temporal(&[1, 2]);
        assert_eq!(
            set.insert(7, 3),
            Err(Error::IndexOutOfBounds { index: 3, len: 2 })
        );
        assert_eq!(
            set.insert(2, 2),
            Err(Error::IndexOutOfBounds { index: 2, len: 1 })
        );
        assert_eq!(set.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_remove() {
        let mut set = temporal(&[1, 2, 3, 4]);
        assert_eq!(set.remove(&2), Some(2));
        assert_eq!(set.remove(&2), None);

        assert_eq!(set.as_slice(), &[1, 3, 4]);
        assert_eq!(set.index_of(&4), Some(2));
        assert!(!set.contains(&2));
        assert!(set.is_consistent());
    }

    #[test]
    fn test_remove_ends() {
        let mut set = temporal(&[1, 2, 3]);
        assert_eq!(set.remove_first(), Some(1));
        assert_eq!(set.remove_last(), Some(3));
        assert_eq!(set.index_of(&2), Some(0));
        assert_eq!(set.remove_last(), Some(2));
        assert_eq!(set.remove_first(), None);
        assert_eq!(set.remove_last(), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_at() {
        let mut set = temporal(&[1, 2, 3]);
        assert_eq!(set.remove_at(5), None);
        assert_eq!(set.remove_at(1), Some(2));
        assert_eq!(set.as_slice(), &[1, 3]);
        assert!(set.is_consistent());
    }

    #[test]
    fn test_update_moves_to_tail() {
        let mut set = temporal(&[1, 2, 3]);
        assert_eq!(set.update(1), Some(1));
        assert_eq!(set.as_slice(), &[2, 3, 1]);

        assert_eq!(set.update(7), None);
        assert_eq!(set.as_slice(), &[2, 3, 1, 7]);
        assert!(set.is_consistent());
    }

    #[test]
    fn test_update_replaces_equal_instance() {
        #[derive(Clone, Debug)]
        struct Tagged(u32, &'static str);
        impl PartialEq for Tagged {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for Tagged {}
        impl Hash for Tagged {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        let mut set = OrderedSet::new();
        set.append(Tagged(1, "old"));
        let previous = set.update(Tagged(1, "new")).unwrap();

        assert_eq!(previous.1, "old");
        assert_eq!(set.first().unwrap().1, "new");
    }

    #[test]
    fn test_ordering_switch() {
        let mut set = temporal(&[3, 1, 2]);
        set.set_ordering(OrderingMode::natural()).unwrap();
        assert_eq!(set.as_slice(), &[1, 2, 3]);

        assert_eq!(
            set.set_ordering(OrderingMode::Temporal),
            Err(Error::OrderingLocked)
        );
        assert!(set.ordering().is_sorted());

        set.sort_by(|a, b| b.cmp(a));
        assert_eq!(set.as_slice(), &[3, 2, 1]);
        assert!(set.is_consistent());
    }

    #[test]
    fn test_retain() {
        let mut set = temporal(&[1, 2, 3, 4, 5, 6]);
        set.retain(|n| n % 2 == 0);
        assert_eq!(set.as_slice(), &[2, 4, 6]);
        assert_eq!(set.index_of(&6), Some(2));
        assert!(!set.contains(&3));
        assert!(set.is_consistent());
    }

    #[test]
    fn test_set_algebra() {
        let a = temporal(&[1, 2, 3, 4]);
        let b = temporal(&[6, 4, 5, 2]);

        assert_eq!(a.union(&b).as_slice(), &[1, 2, 3, 4, 6, 5]);
        assert_eq!(a.intersection(&b).as_slice(), &[2, 4]);
        assert_eq!(a.subtracting(&b).as_slice(), &[1, 3]);
        assert_eq!(a.symmetric_difference(&b).as_slice(), &[1, 3, 6, 5]);
        assert!(a.union(&b).is_consistent());
        assert!(a.symmetric_difference(&b).is_consistent());
    }

    #[test]
    fn test_set_relations() {
        let a = temporal(&[1, 2]);
        let b = temporal(&[2, 1, 3]);
        let c = temporal(&[7]);

        assert!(a.is_subset(&b));
        assert!(b.is_superset(&a));
        assert!(!b.is_subset(&a));
        assert!(a.is_disjoint(&c));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        assert_eq!(temporal(&[1, 2]), temporal(&[1, 2]));
        assert_ne!(temporal(&[1, 2]), temporal(&[2, 1]));
    }

    #[test]
    fn test_from_sequence_dedups() {
        let set = OrderedSet::from_sequence(vec![3, 1, 3, 2, 1], OrderingMode::Temporal);
        assert_eq!(set.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn test_invariant_under_mixed_ops() {
        let mut set = OrderedSet::new();
        for i in 0..200u32 {
            let n = (i * 37) % 50;
            match i % 5 {
                0 | 1 => {
                    set.append(n);
                }
                2 => {
                    set.remove(&n);
                }
                3 => {
                    set.update(n);
                }
                _ => {
                    let limit = set.len() - usize::from(set.contains(&n));
                    set.insert(n, n as usize % (limit + 1)).unwrap();
                }
            }
            assert!(set.is_consistent());
            for (position, element) in set.iter().enumerate() {
                assert_eq!(set.get(set.index_of(element).unwrap()), Some(element));
                assert_eq!(set.index_of(element), Some(position));
            }
        }
    }
}
