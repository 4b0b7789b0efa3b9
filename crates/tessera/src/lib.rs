//! # tessera
//!
//! Thread-safe, ordered collections for concurrent applications.
//!
//! ## Architecture
//! - **RecursiveSharedLock**: reentrant reader/writer lock guarding every
//!   concurrent container
//! - **OrderedSet**: array + hash set + position index, kept consistent
//!   under insert/remove/reorder
//! - **ConcurrentMap / ConcurrentOrderedSet**: lock-guarded containers with
//!   snapshot traversal
//!
//! The capacity-bounded LRU cache lives in the `tesseracache` crate.

#![warn(missing_docs)]

pub mod atomic;
pub mod concurrent_set;
mod error;
pub mod lock;
pub mod map;
pub mod ordered_set;
pub mod size;
pub mod stack;
pub mod traverse;
pub mod weak_set;

pub use atomic::AtomicCounter;
pub use concurrent_set::ConcurrentOrderedSet;
pub use error::{Error, Result};
pub use lock::{ExclusiveGuard, Guarded, RecursiveSharedLock, SharedGuard};
pub use map::ConcurrentMap;
pub use ordered_set::{Comparator, OrderedSet, OrderingMode};
pub use size::{EstimatedSize, DEFAULT_ESTIMATE};
pub use stack::{DequeStorage, LinkedStorage, Stack, StackStorage, VecStorage};
pub use traverse::Traverse;
pub use weak_set::WeakSet;
