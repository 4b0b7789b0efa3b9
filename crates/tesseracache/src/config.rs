//! Cache configuration

use tessera::{Error, Result};

/// Default entry bound for [`CacheConfig::default`]
pub const DEFAULT_CAPACITY: usize = 1024;

/// What the cache budget counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Each entry contributes 1
    Count(usize),

    /// Each entry contributes its estimated size in bytes
    Bytes(usize),
}

impl Capacity {
    /// The configured bound
    pub fn limit(&self) -> usize {
        match *self {
            Capacity::Count(n) | Capacity::Bytes(n) => n,
        }
    }

    /// Whether the budget is in bytes
    pub fn is_bytes(&self) -> bool {
        matches!(self, Capacity::Bytes(_))
    }
}

/// Configuration for a [`SharedCache`](crate::SharedCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Capacity bound
    pub capacity: Capacity,

    /// Whether hit/miss/eviction counters are updated
    pub record_stats: bool,
}

impl CacheConfig {
    /// Bound the cache to `max` entries
    pub fn count(max: usize) -> Self {
        Self {
            capacity: Capacity::Count(max),
            ..Self::default()
        }
    }

    /// Bound the cache to `max` estimated bytes
    pub fn bytes(max: usize) -> Self {
        Self {
            capacity: Capacity::Bytes(max),
            ..Self::default()
        }
    }

    /// Enable or disable statistics
    pub fn record_stats(mut self, enabled: bool) -> Self {
        self.record_stats = enabled;
        self
    }

    /// Reject unusable settings
    ///
    /// # Errors
    /// * `Error::ZeroCapacity` - the bound is zero
    pub fn validate(&self) -> Result<()> {
        if self.capacity.limit() == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::Count(DEFAULT_CAPACITY),
            record_stats: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, Capacity::Count(DEFAULT_CAPACITY));
        assert!(config.record_stats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = CacheConfig::bytes(4096).record_stats(false);
        assert!(config.capacity.is_bytes());
        assert_eq!(config.capacity.limit(), 4096);
        assert!(!config.record_stats);
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(CacheConfig::count(0).validate(), Err(Error::ZeroCapacity));
        assert_eq!(CacheConfig::bytes(0).validate(), Err(Error::ZeroCapacity));
    }
}
