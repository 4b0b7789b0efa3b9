//! LRU (Least Recently Used) cache engine
//!
//! Recency lives in a temporal-mode [`OrderedSet`] of keys: the head is the
//! least recently used key, the tail the most recent. Values and their size
//! contributions live in a hash map. Every access or insert moves the key to
//! the tail; eviction pops the head.

use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use tessera::{Error, EstimatedSize, OrderedSet, Result};
use tracing::debug;

use crate::config::Capacity;

/// Size function for byte-based budgets
pub type Weigher<V> = fn(&V) -> usize;

/// Stored value plus its contribution to the budget
#[derive(Clone)]
struct Entry<V> {
    value: V,
    size: usize,
}

/// Result of a put
#[derive(Debug, PartialEq, Eq)]
pub enum PutOutcome<K, V> {
    /// A new key was admitted
    Inserted {
        /// Entries evicted to make room, least recent first
        evicted: Vec<(K, V)>,
    },

    /// An existing key's value was replaced
    Replaced {
        /// Value that was replaced
        previous: V,
        /// Entries evicted to make room, least recent first
        evicted: Vec<(K, V)>,
    },

    /// The value alone meets or exceeds the byte budget; nothing changed
    Rejected(V),

    /// A `None` value removed the key
    Removed(Option<V>),
}

impl<K, V> PutOutcome<K, V> {
    /// Whether the value is now stored
    pub fn is_admitted(&self) -> bool {
        matches!(self, PutOutcome::Inserted { .. } | PutOutcome::Replaced { .. })
    }

    /// Entries evicted by this put
    pub fn evicted(&self) -> &[(K, V)] {
        match self {
            PutOutcome::Inserted { evicted } | PutOutcome::Replaced { evicted, .. } => evicted,
            PutOutcome::Rejected(_) | PutOutcome::Removed(_) => &[],
        }
    }
}

/// Capacity-bounded LRU cache, not synchronized
pub struct LruCache<K, V> {
    keys: OrderedSet<K>,
    data: HashMap<K, Entry<V>, RandomState>,
    current: usize,
    capacity: Capacity,
    weigher: Weigher<V>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache sized by [`EstimatedSize`] when the budget is in bytes
    ///
    /// # Errors
    /// * `Error::ZeroCapacity` - the bound is zero
    pub fn new(capacity: Capacity) -> Result<Self>
    where
        V: EstimatedSize,
    {
        Self::with_weigher(capacity, V::estimated_size)
    }

    /// Create a cache bounded to `max` entries
    pub fn counted(max: usize) -> Result<Self> {
        Self::with_weigher(Capacity::Count(max), |_| 1)
    }

    /// Create a cache with an explicit size function
    ///
    /// `weigher` is only consulted for [`Capacity::Bytes`].
    pub fn with_weigher(capacity: Capacity, weigher: Weigher<V>) -> Result<Self> {
        if capacity.limit() == 0 {
            return Err(Error::ZeroCapacity);
        }

        Ok(Self {
            keys: OrderedSet::new(),
            data: HashMap::with_hasher(RandomState::new()),
            current: 0,
            capacity,
            weigher,
        })
    }

    /// Get a value and mark it most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.data.contains_key(key) {
            return None;
        }
        self.keys.update(key.clone());
        self.data.get(key).map(|entry| &entry.value)
    }

    /// Get a value without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.data.get(key).map(|entry| &entry.value)
    }

    /// Check if `key` is cached, without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    /// Insert or replace a value, evicting least recently used entries
    ///
    /// With a byte budget, a value whose size alone reaches the budget is
    /// rejected and any existing value for `key` stays in place.
    pub fn put(&mut self, key: K, value: V) -> PutOutcome<K, V> {
        let size = self.cost(&value);
        if self.capacity.is_bytes() && size >= self.capacity.limit() {
            debug!(size, budget = self.capacity.limit(), "rejected oversized value");
            return PutOutcome::Rejected(value);
        }

        let previous = self.detach(&key);
        let evicted = self.evict_until_fits(size);

        self.keys.append(key.clone());
        self.data.insert(key, Entry { value, size });
        self.current += size;

        debug_assert!(self.current <= self.capacity.limit());
        match previous {
            Some(previous) => PutOutcome::Replaced { previous, evicted },
            None => PutOutcome::Inserted { evicted },
        }
    }

    /// [`put`](Self::put) where `None` means remove
    pub fn put_optional(&mut self, key: K, value: Option<V>) -> PutOutcome<K, V> {
        match value {
            Some(value) => self.put(key, value),
            None => PutOutcome::Removed(self.remove(&key)),
        }
    }

    /// Remove a key from the cache
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.detach(key)
    }

    /// Pop the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let key = self.keys.remove_first()?;
        let entry = self.data.remove(&key)?;
        self.current -= entry.size;
        Some((key, entry.value))
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    /// Entries from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys
            .iter()
            .filter_map(|key| self.data.get(key).map(|entry| (key, &entry.value)))
    }

    /// Copy of every entry, least recently used first
    ///
    /// # Errors
    /// * `Error::BadAccess` - a key in the recency order has no value
    pub fn snapshot(&self) -> Result<Vec<(K, V)>>
    where
        V: Clone,
    {
        self.keys
            .iter()
            .map(|key| {
                self.data
                    .get(key)
                    .map(|entry| (key.clone(), entry.value.clone()))
                    .ok_or(Error::BadAccess)
            })
            .collect()
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Budget consumed: entry count or estimated bytes
    pub fn current_capacity(&self) -> usize {
        self.current
    }

    /// Configured bound
    pub fn max_capacity(&self) -> usize {
        self.capacity.limit()
    }

    /// Configured capacity
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.keys.clear();
        self.data.clear();
        self.current = 0;
    }

    /// Check the accounting invariant
    ///
    /// True when the recency order and the value map hold the same keys and
    /// the consumed budget is the exact sum of live contributions, within
    /// the bound.
    pub fn is_consistent(&self) -> bool {
        let total = self
            .data
            .values()
            .try_fold(0usize, |acc, entry| acc.checked_add(entry.size));
        self.keys.is_consistent()
            && self.keys.len() == self.data.len()
            && self.keys.iter().all(|key| self.data.contains_key(key))
            && total == Some(self.current)
            && self.current <= self.capacity.limit()
    }

    fn cost(&self, value: &V) -> usize {
        match self.capacity {
            Capacity::Count(_) => 1,
            Capacity::Bytes(_) => (self.weigher)(value),
        }
    }

    fn detach(&mut self, key: &K) -> Option<V> {
        let entry = self.data.remove(key)?;
        self.keys.remove(key);
        self.current -= entry.size;
        Some(entry.value)
    }

    fn evict_until_fits(&mut self, size: usize) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        // `current <= limit` always holds, so the subtraction cannot wrap
        while size > self.capacity.limit() - self.current {
            match self.pop_lru() {
                Some(pair) => evicted.push(pair),
                None => break,
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), current = self.current, "evicted lru entries");
        }
        evicted
    }
}

impl<K, V> Clone for LruCache<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            data: self.data.clone(),
            current: self.current,
            capacity: self.capacity,
            weigher: self.weigher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    fn keys_of<V>(cache: &LruCache<&'static str, V>) -> Vec<&'static str> {
        cache.keys().copied().collect()
    }

    #[test]
    fn test_lru_basic() {
        let mut cache = LruCache::counted(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = LruCache::counted(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        let outcome = cache.put(3, "c"); // Should evict 1

        assert_eq!(outcome.evicted(), &[(1, "a")]);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.get(&3), Some(&"c"));
    }

    #[test]
    fn test_lru_update() {
        let mut cache = LruCache::counted(2).unwrap();

        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a"); // Move "a" to the tail
        cache.put("c", 3); // Should evict "b"

        assert_eq!(keys_of(&cache), vec!["a", "c"]);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn test_lru_recency_law() {
        let mut cache = LruCache::counted(3).unwrap();
        for k in ["k1", "k2", "k3", "k4"] {
            cache.put(k, ());
        }
        assert!(!cache.contains(&"k1"));

        let mut cache = LruCache::counted(3).unwrap();
        for k in ["k1", "k2", "k3"] {
            cache.put(k, ());
        }
        cache.get(&"k1");
        cache.put("k4", ());
        assert!(cache.contains(&"k1"));
        assert!(!cache.contains(&"k2"));
    }

    #[test]
    fn test_lru_remove() {
        let mut cache = LruCache::counted(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");

        assert_eq!(cache.remove(&2), Some("b"));
        assert_eq!(cache.remove(&2), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.current_capacity(), 2);
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_lru_clear() {
        let mut cache = LruCache::counted(3).unwrap();

        cache.put(1, "a");
        cache.put(2, "b");
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.current_capacity(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_overwrite() {
        let mut cache = LruCache::counted(2).unwrap();

        cache.put(1, "a");
        cache.put(2, "x");
        let outcome = cache.put(1, "b"); // Overwrite, no eviction

        assert_eq!(
            outcome,
            PutOutcome::Replaced {
                previous: "a",
                evicted: vec![]
            }
        );
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(cache.get(&1), Some(&"b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_put_none_removes() {
        let mut cache = LruCache::counted(2).unwrap();
        cache.put("a", 1);

        assert_eq!(cache.put_optional("a", None), PutOutcome::Removed(Some(1)));
        assert_eq!(cache.put_optional("a", None), PutOutcome::Removed(None));
        assert_eq!(cache.current_capacity(), 0);
        assert!(cache.put_optional("b", Some(2)).is_admitted());
    }

    #[test]
    fn test_peek_keeps_recency() {
        let mut cache = LruCache::counted(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.peek(&"a"), Some(&1));
        cache.put("c", 3);
        assert!(!cache.contains(&"a"));
    }

    #[test]
    fn test_zero_capacity() {
        assert!(matches!(
            LruCache::<u8, u8>::counted(0),
            Err(Error::ZeroCapacity)
        ));
    }

    #[test]
    fn test_bytes_accounting() {
        let header = mem::size_of::<Vec<u8>>();
        let mut cache = LruCache::new(Capacity::Bytes(3 * (header + 10))).unwrap();

        cache.put("a", vec![0u8; 10]);
        cache.put("b", vec![0u8; 10]);
        assert_eq!(cache.current_capacity(), 2 * (header + 10));

        cache.put("a", vec![0u8; 5]);
        assert_eq!(cache.current_capacity(), 2 * header + 15);
        assert!(cache.is_consistent());

        // Needs room for header + 30 bytes: evicts "b" (the LRU)
        let outcome = cache.put("c", vec![0u8; 30]);
        assert_eq!(outcome.evicted().len(), 1);
        assert_eq!(outcome.evicted()[0].0, "b");
        assert_eq!(keys_of(&cache), vec!["a", "c"]);
        assert_eq!(cache.current_capacity(), 2 * header + 35);
        assert!(cache.is_consistent());
    }

    #[test]
    fn test_bytes_rejects_oversized_insert() {
        let mut cache =
            LruCache::with_weigher(Capacity::Bytes(100), |v: &Vec<u8>| v.len()).unwrap();
        cache.put("small", vec![0; 40]);

        let outcome = cache.put("huge", vec![0; 150]);
        assert!(matches!(outcome, PutOutcome::Rejected(_)));
        assert_eq!(keys_of(&cache), vec!["small"]);
        assert_eq!(cache.current_capacity(), 40);
    }

    #[test]
    fn test_bytes_rejects_oversized_replacement() {
        let mut cache =
            LruCache::with_weigher(Capacity::Bytes(100), |v: &Vec<u8>| v.len()).unwrap();
        cache.put("k", vec![1; 10]);

        assert!(!cache.put("k", vec![2; 100]).is_admitted());
        assert_eq!(cache.peek(&"k"), Some(&vec![1; 10]));
        assert_eq!(cache.current_capacity(), 10);
    }

    #[test]
    fn test_bytes_budget_near_usize_max() {
        let mut cache =
            LruCache::with_weigher(Capacity::Bytes(usize::MAX), |v: &usize| *v).unwrap();
        let half = usize::MAX / 2 + 1;

        assert!(cache.put("a", half).is_admitted());
        let outcome = cache.put("b", half);

        assert_eq!(outcome.evicted(), &[("a", half)]);
        assert_eq!(keys_of(&cache), vec!["b"]);
        assert_eq!(cache.current_capacity(), half);
        assert!(cache.is_consistent());
    }

    #[test]
    fn test_bytes_evicts_until_fit() {
        let mut cache =
            LruCache::with_weigher(Capacity::Bytes(100), |v: &Vec<u8>| v.len()).unwrap();
        for k in ["a", "b", "c", "d"] {
            cache.put(k, vec![0; 25]);
        }
        assert_eq!(cache.current_capacity(), 100);

        let outcome = cache.put("e", vec![0; 60]);
        let evicted: Vec<_> = outcome.evicted().iter().map(|(k, _)| *k).collect();
        assert_eq!(evicted, vec!["a", "b", "c"]);
        assert_eq!(keys_of(&cache), vec!["d", "e"]);
        assert_eq!(cache.current_capacity(), 85);
    }

    #[test]
    fn test_snapshot_order() {
        let mut cache = LruCache::counted(3).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a");

        assert_eq!(cache.snapshot().unwrap(), vec![("b", 2), ("a", 1)]);
        assert_eq!(cache.iter().count(), 2);
    }

    #[test]
    fn test_accounting_under_mixed_ops() {
        let mut cache = LruCache::with_weigher(Capacity::Bytes(64), |v: &String| v.len()).unwrap();
        for i in 0..300usize {
            let key = i % 17;
            match i % 4 {
                0 | 1 => {
                    cache.put(key, "x".repeat(i % 40));
                }
                2 => {
                    cache.get(&key);
                }
                _ => {
                    cache.remove(&key);
                }
            }
            assert!(cache.is_consistent());
            assert!(cache.current_capacity() <= 64);
        }
    }
}
