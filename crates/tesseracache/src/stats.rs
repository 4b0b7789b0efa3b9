//! Cache statistics tracking

use tessera::AtomicCounter;

/// Statistics for cache performance tracking
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    hits: AtomicCounter,
    misses: AtomicCounter,
    inserts: AtomicCounter,
    evictions: AtomicCounter,
    rejections: AtomicCounter,
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.increment();
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.increment();
    }

    /// Record an admitted put
    pub fn record_insert(&self) {
        self.inserts.increment();
    }

    /// Record `count` evictions
    pub fn record_evictions(&self, count: usize) {
        self.evictions.add(count as u64);
    }

    /// Record an oversized value turned away
    pub fn record_rejection(&self) {
        self.rejections.increment();
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// Get total admitted puts
    pub fn inserts(&self) -> u64 {
        self.inserts.get()
    }

    /// Get total evictions
    pub fn evictions(&self) -> u64 {
        self.evictions.get()
    }

    /// Get total rejections
    pub fn rejections(&self) -> u64 {
        self.rejections.get()
    }

    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.set(0);
        self.misses.set(0);
        self.inserts.set(0);
        self.evictions.set(0);
        self.rejections.set(0);
    }
}
