//! SharedCache: thread-safe LRU cache handle

use std::fmt;
use std::hash::Hash;

use tessera::{EstimatedSize, Guarded, Result, Traverse};

use crate::config::{CacheConfig, Capacity};
use crate::lru::{LruCache, PutOutcome, Weigher};
use crate::stats::CacheStats;

/// Capacity-bounded LRU cache safe to share between threads
///
/// Every operation that touches recency (including [`get`](Self::get))
/// takes the exclusive mode of the cache's
/// [`RecursiveSharedLock`](tessera::RecursiveSharedLock);
/// [`peek`](Self::peek), [`contains`](Self::contains) and traversal
/// snapshots take the shared mode.
pub struct SharedCache<K, V> {
    /// LRU engine behind the lock
    inner: Guarded<LruCache<K, V>>,

    /// Cache statistics
    stats: CacheStats,

    /// Whether `stats` is updated
    record_stats: bool,
}

impl<K, V> SharedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new cache from `config`, sizing values by [`EstimatedSize`]
    ///
    /// # Arguments
    /// * `config` - Capacity bound and statistics switch
    ///
    /// # Returns
    /// * `Result<SharedCache>` - `Error::ZeroCapacity` for a zero bound
    pub fn new(config: CacheConfig) -> Result<Self>
    where
        V: EstimatedSize,
    {
        Self::with_weigher(config, V::estimated_size)
    }

    /// Create a new cache from `config` with an explicit size function
    pub fn with_weigher(config: CacheConfig, weigher: Weigher<V>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_lru(
            LruCache::with_weigher(config.capacity, weigher)?,
            config.record_stats,
        ))
    }

    /// Create a new cache holding at most `max` entries
    pub fn with_count(max: usize) -> Result<Self> {
        Ok(Self::from_lru(LruCache::counted(max)?, true))
    }

    fn from_lru(lru: LruCache<K, V>, record_stats: bool) -> Self {
        Self {
            inner: Guarded::new(lru),
            stats: CacheStats::new(),
            record_stats,
        }
    }

    /// Get a value and mark it most recently used
    ///
    /// # Arguments
    /// * `key` - Key to look up
    ///
    /// # Returns
    /// * `Option<V>` - Copy of the cached value; a miss is not an error
    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.inner.write(|cache| cache.get(key).cloned());
        if self.record_stats {
            match value {
                Some(_) => self.stats.record_hit(),
                None => self.stats.record_miss(),
            }
        }
        value
    }

    /// Get a value without touching recency or statistics
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.read(|cache| cache.peek(key).cloned())
    }

    /// Check if `key` is cached, without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.inner.read(|cache| cache.contains(key))
    }

    /// Insert or replace a value
    ///
    /// # Returns
    /// * `bool` - false if the value was rejected as larger than the byte budget
    pub fn put(&self, key: K, value: V) -> bool {
        let outcome = self.inner.write(|cache| cache.put(key, value));
        self.observe(&outcome);
        outcome.is_admitted()
    }

    /// Insert, replace, or (for `None`) remove
    ///
    /// # Returns
    /// * `bool` - true if a value is now stored under `key`
    pub fn put_optional(&self, key: K, value: Option<V>) -> bool {
        let outcome = self.inner.write(|cache| cache.put_optional(key, value));
        self.observe(&outcome);
        outcome.is_admitted()
    }

    /// Remove a key from the cache
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.write(|cache| cache.remove(key))
    }

    /// Return the cached value for `key`, computing and caching it if absent
    ///
    /// The exclusive mode is held for the whole call, so `supplier` runs at
    /// most once per miss even under contention. It runs with no borrow live
    /// and may use this cache from the same thread; if it caches `key`
    /// itself, that value wins. The computed value goes through the same
    /// capacity accounting as [`put`](Self::put), so an oversized value is
    /// returned but not cached.
    pub fn compute_if_absent<F>(&self, key: K, supplier: F) -> V
    where
        F: FnOnce() -> V,
    {
        let _hold = self.inner.hold();
        if let Some(existing) = self.get(&key) {
            return existing;
        }

        let value = supplier();
        if let Some(existing) = self.inner.write(|cache| cache.get(&key).cloned()) {
            return existing;
        }

        let outcome = self.inner.write(|cache| cache.put(key, value.clone()));
        self.observe(&outcome);
        value
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> Vec<K> {
        self.inner.read(|cache| cache.keys().cloned().collect())
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.inner.read(LruCache::len)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read(LruCache::is_empty)
    }

    /// Budget consumed: entry count or estimated bytes
    pub fn current_capacity(&self) -> usize {
        self.inner.read(LruCache::current_capacity)
    }

    /// Configured bound
    pub fn max_capacity(&self) -> usize {
        self.inner.read(LruCache::max_capacity)
    }

    /// Configured capacity
    pub fn capacity(&self) -> Capacity {
        self.inner.read(LruCache::capacity)
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Clear the cache and reset statistics
    pub fn clear(&self) {
        self.inner.write(LruCache::clear);
        self.stats.reset();
    }

    /// Check the accounting invariant
    pub fn is_consistent(&self) -> bool {
        self.inner.read(LruCache::is_consistent)
    }

    fn observe(&self, outcome: &PutOutcome<K, V>) {
        if !self.record_stats {
            return;
        }
        match outcome {
            PutOutcome::Inserted { evicted } | PutOutcome::Replaced { evicted, .. } => {
                self.stats.record_insert();
                self.stats.record_evictions(evicted.len());
            }
            PutOutcome::Rejected(_) => self.stats.record_rejection(),
            PutOutcome::Removed(_) => {}
        }
    }
}

impl<K, V> Traverse for SharedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Item = (K, V);

    /// Entries from least to most recently used, copied under one shared hold
    fn snapshot(&self) -> Result<Vec<(K, V)>> {
        self.inner.read(LruCache::snapshot)
    }
}

/// Copies entries and counters; the copy gets a fresh, unheld lock.
impl<K, V> Clone for SharedCache<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stats: self.stats.clone(),
            record_stats: self.record_stats,
        }
    }
}

impl<K, V> fmt::Debug for SharedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("current", &self.current_capacity())
            .finish()
    }
}
