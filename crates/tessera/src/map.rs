//! Lock-guarded hash map

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use ahash::RandomState;

use crate::error::Result;
use crate::lock::Guarded;
use crate::traverse::Traverse;

/// Hash map behind a [`RecursiveSharedLock`](crate::lock::RecursiveSharedLock)
///
/// Lookups take the shared mode and return clones; every mutation takes the
/// exclusive mode. Traversal order is unspecified.
pub struct ConcurrentMap<K, V> {
    inner: Guarded<HashMap<K, V, RandomState>>,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create an empty map
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty map with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Guarded::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::new(),
            )),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner.read(HashMap::len)
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read(HashMap::is_empty)
    }

    /// Copy of the value for `key`
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read(|map| map.get(key).cloned())
    }

    /// Check if `key` is present
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.read(|map| map.contains_key(key))
    }

    /// Insert or replace; returns the previous value
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write(|map| map.insert(key, value))
    }

    /// Remove `key`; returns its value
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.write(|map| map.remove(key))
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.inner.write(HashMap::clear)
    }

    /// Return the value for `key`, inserting `supplier()` if absent
    ///
    /// `supplier` runs at most once, with the exclusive mode held but no
    /// borrow live, so it may read or write this map from the same thread.
    /// If it inserts `key` itself, that value wins and is returned.
    pub fn compute_if_absent<F>(&self, key: K, supplier: F) -> V
    where
        F: FnOnce() -> V,
    {
        let _hold = self.inner.hold();
        if let Some(existing) = self.inner.read(|map| map.get(&key).cloned()) {
            return existing;
        }

        let value = supplier();
        self.inner
            .write(|map| map.entry(key).or_insert(value).clone())
    }

    /// Apply `f` to the value for `key` in place
    ///
    /// # Returns
    /// * `Option<R>` - `f`'s result, or `None` if the key is absent
    pub fn update<R, F>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        self.inner.write(|map| map.get_mut(key).map(f))
    }

    /// Copy of every key
    pub fn keys(&self) -> Vec<K> {
        self.inner.read(|map| map.keys().cloned().collect())
    }

    /// Copy of every value
    pub fn values(&self) -> Vec<V> {
        self.inner.read(|map| map.values().cloned().collect())
    }

    /// Copy of the whole map
    pub fn to_map(&self) -> HashMap<K, V, RandomState> {
        self.inner.read(HashMap::clone)
    }
}

impl<K, V> Traverse for ConcurrentMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Item = (K, V);

    fn snapshot(&self) -> Result<Vec<(K, V)>> {
        Ok(self.inner.read(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        }))
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Copies the entries; the copy gets a fresh, unheld lock.
impl<K: Clone, V: Clone> Clone for ConcurrentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        map.inner.write(|inner| inner.extend(iter));
        map
    }
}

impl<K, V> fmt::Debug for ConcurrentMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.read(|map| f.debug_map().entries(map.iter()).finish())
    }
}
