//! # tesseracache
//!
//! Capacity-bounded LRU cache built on tessera collections.
//!
//! ## Architecture
//! - **Recency queue**: temporal-mode `OrderedSet` of keys, head is the
//!   least recently used
//! - **Storage**: AHash map from key to value and its budget contribution
//! - **Budget**: entry count, or estimated bytes via a size function
//! - **SharedCache**: the engine behind a `RecursiveSharedLock`, with
//!   hit/miss statistics and snapshot traversal

#![warn(missing_docs)]

mod cache;
mod config;
mod lru;
mod stats;

pub use cache::SharedCache;
pub use config::{CacheConfig, Capacity, DEFAULT_CAPACITY};
pub use lru::{LruCache, PutOutcome, Weigher};
pub use stats::CacheStats;
