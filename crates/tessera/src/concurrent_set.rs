//! Thread-safe ordered set
//!
//! Wraps [`OrderedSet`] in a [`Guarded`] cell: reads take the shared mode,
//! anything that touches the sequence, membership set or index map takes
//! the exclusive mode. Accessors return owned copies so no borrow outlives
//! the lock.

use std::cmp;
use std::fmt;
use std::hash::Hash;

use crate::error::Result;
use crate::lock::Guarded;
use crate::ordered_set::{OrderedSet, OrderingMode};
use crate::traverse::Traverse;

/// Lock-protected [`OrderedSet`]
pub struct ConcurrentOrderedSet<E> {
    inner: Guarded<OrderedSet<E>>,
}

impl<E> ConcurrentOrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    /// Create an empty set in temporal mode
    pub fn new() -> Self {
        Self::from_set(OrderedSet::new())
    }

    /// Create an empty set with the given ordering mode
    pub fn with_ordering(ordering: OrderingMode<E>) -> Self {
        Self::from_set(OrderedSet::with_ordering(ordering))
    }

    /// Take ownership of an existing unsynchronized set
    pub fn from_set(set: OrderedSet<E>) -> Self {
        Self {
            inner: Guarded::new(set),
        }
    }

    /// Run `f` against the set under the shared mode
    pub fn read<R>(&self, f: impl FnOnce(&OrderedSet<E>) -> R) -> R {
        self.inner.read(f)
    }

    /// Run `f` against the set under the exclusive mode
    pub fn write<R>(&self, f: impl FnOnce(&mut OrderedSet<E>) -> R) -> R {
        self.inner.write(f)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.inner.read(OrderedSet::len)
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read(OrderedSet::is_empty)
    }

    /// Membership test
    pub fn contains(&self, element: &E) -> bool {
        self.inner.read(|set| set.contains(element))
    }

    /// Position of `element`
    pub fn index_of(&self, element: &E) -> Option<usize> {
        self.inner.read(|set| set.index_of(element))
    }

    /// Copy of the element at `index`
    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.read(|set| set.get(index).cloned())
    }

    /// Copy of the head
    pub fn first(&self) -> Option<E> {
        self.inner.read(|set| set.first().cloned())
    }

    /// Copy of the tail
    pub fn last(&self) -> Option<E> {
        self.inner.read(|set| set.last().cloned())
    }

    /// Copy of the sequence
    pub fn to_vec(&self) -> Vec<E> {
        self.inner.read(|set| set.as_slice().to_vec())
    }

    /// Copy of the whole set, ordering mode included
    pub fn to_set(&self) -> OrderedSet<E> {
        self.inner.read(OrderedSet::clone)
    }

    /// See [`OrderedSet::append`]
    pub fn append(&self, element: E) -> bool {
        self.inner.write(|set| set.append(element))
    }

    /// See [`OrderedSet::insert`]
    pub fn insert(&self, element: E, index: usize) -> Result<()> {
        self.inner.write(|set| set.insert(element, index))
    }

    /// See [`OrderedSet::remove`]
    pub fn remove(&self, element: &E) -> Option<E> {
        self.inner.write(|set| set.remove(element))
    }

    /// See [`OrderedSet::remove_at`]
    pub fn remove_at(&self, index: usize) -> Option<E> {
        self.inner.write(|set| set.remove_at(index))
    }

    /// See [`OrderedSet::remove_first`]
    pub fn remove_first(&self) -> Option<E> {
        self.inner.write(OrderedSet::remove_first)
    }

    /// See [`OrderedSet::remove_last`]
    pub fn remove_last(&self) -> Option<E> {
        self.inner.write(OrderedSet::remove_last)
    }

    /// See [`OrderedSet::update`]
    pub fn update(&self, element: E) -> Option<E> {
        self.inner.write(|set| set.update(element))
    }

    /// Remove every element
    pub fn clear(&self) {
        self.inner.write(OrderedSet::clear)
    }

    /// See [`OrderedSet::retain`]
    pub fn retain<F>(&self, keep: F)
    where
        F: FnMut(&E) -> bool,
    {
        self.inner.write(|set| set.retain(keep))
    }

    /// See [`OrderedSet::set_ordering`]
    pub fn set_ordering(&self, ordering: OrderingMode<E>) -> Result<()> {
        self.inner.write(|set| set.set_ordering(ordering))
    }

    /// See [`OrderedSet::sort_by`]
    pub fn sort_by<F>(&self, compare: F)
    where
        F: Fn(&E, &E) -> cmp::Ordering + Send + Sync + 'static,
    {
        self.inner.write(|set| set.sort_by(compare))
    }

    /// See [`OrderedSet::union`]
    pub fn union(&self, other: &Self) -> Self {
        self.combine(other, OrderedSet::union)
    }

    /// See [`OrderedSet::intersection`]
    pub fn intersection(&self, other: &Self) -> Self {
        self.combine(other, OrderedSet::intersection)
    }

    /// See [`OrderedSet::subtracting`]
    pub fn subtracting(&self, other: &Self) -> Self {
        self.combine(other, OrderedSet::subtracting)
    }

    /// See [`OrderedSet::symmetric_difference`]
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.combine(other, OrderedSet::symmetric_difference)
    }

    /// Check the representation invariant
    pub fn is_consistent(&self) -> bool {
        self.inner.read(OrderedSet::is_consistent)
    }

    // Copies `other` first so the two locks are never held together.
    fn combine<F>(&self, other: &Self, op: F) -> Self
    where
        F: FnOnce(&OrderedSet<E>, &OrderedSet<E>) -> OrderedSet<E>,
    {
        let other = other.to_set();
        Self::from_set(self.inner.read(|set| op(set, &other)))
    }
}

impl<E> Traverse for ConcurrentOrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    type Item = E;

    fn snapshot(&self) -> Result<Vec<E>> {
        Ok(self.to_vec())
    }
}

impl<E> Default for ConcurrentOrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Copies the contents; the copy gets a fresh, unheld lock.
impl<E: Clone> Clone for ConcurrentOrderedSet<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> PartialEq for ConcurrentOrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        let other = other.to_vec();
        self.inner.read(|set| set.as_slice() == other.as_slice())
    }
}

impl<E> fmt::Debug for ConcurrentOrderedSet<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.read(|set| f.debug_tuple("ConcurrentOrderedSet").field(set).finish())
    }
}

impl<E> From<OrderedSet<E>> for ConcurrentOrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn from(set: OrderedSet<E>) -> Self {
        Self::from_set(set)
    }
}

impl<E> FromIterator<E> for ConcurrentOrderedSet<E>
where
    E: Hash + Eq + Clone,
{
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect())
    }
}
