//! Snapshot-isolated traversal
//!
//! Every operation copies the container's state under a single shared-lock
//! critical section and then runs the callback with no lock held. Mutations
//! that land after the snapshot are not observed, and the callback is free
//! to call back into the container.

use crate::error::Result;

/// Higher-order operations over a point-in-time copy of a container
pub trait Traverse {
    /// Element yielded by the traversal
    type Item;

    /// Copy the current contents in traversal order
    ///
    /// # Errors
    /// * `Error::BadAccess` - the container's order and data structures
    ///   disagreed while copying
    fn snapshot(&self) -> Result<Vec<Self::Item>>;

    /// Call `f` on every item
    fn for_each<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(Self::Item),
    {
        self.snapshot()?.into_iter().for_each(f);
        Ok(())
    }

    /// Transform every item
    fn map<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(Self::Item) -> T,
    {
        Ok(self.snapshot()?.into_iter().map(f).collect())
    }

    /// Items for which `predicate` holds
    fn filter<F>(&self, mut predicate: F) -> Result<Vec<Self::Item>>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|item| predicate(item))
            .collect())
    }

    /// Transform every item, dropping the `None` results
    fn compact_map<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(Self::Item) -> Option<T>,
    {
        Ok(self.snapshot()?.into_iter().filter_map(f).collect())
    }

    /// Fold every item into an accumulator
    fn reduce<A, F>(&self, init: A, f: F) -> Result<A>
    where
        F: FnMut(A, Self::Item) -> A,
    {
        Ok(self.snapshot()?.into_iter().fold(init, f))
    }

    /// First item for which `predicate` holds
    fn first_where<F>(&self, mut predicate: F) -> Result<Option<Self::Item>>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        Ok(self.snapshot()?.into_iter().find(|item| predicate(item)))
    }
}
