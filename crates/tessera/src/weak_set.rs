//! Set of weak references keyed by allocation identity
//!
//! Entries never keep their target alive. Dead entries are not dropped
//! eagerly; [`WeakSet::sanitize`] compacts them and runs before every
//! structural mutation.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use ahash::RandomState;
use tracing::trace;

use crate::lock::Guarded;

/// Identity token: the address of the shared allocation
fn token<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as usize
}

fn sanitize_entries<T>(entries: &mut HashMap<usize, Weak<T>, RandomState>) -> usize {
    let before = entries.len();
    entries.retain(|_, weak| weak.strong_count() > 0);
    let dropped = before - entries.len();
    if dropped > 0 {
        trace!(dropped, "sanitized dead weak entries");
    }
    dropped
}

/// Thread-safe identity set of [`Weak`] references
pub struct WeakSet<T> {
    entries: Guarded<HashMap<usize, Weak<T>, RandomState>>,
}

impl<T> WeakSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            entries: Guarded::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    /// Track `value` by identity
    ///
    /// # Returns
    /// * `bool` - true if it was not already tracked
    pub fn insert(&self, value: &Arc<T>) -> bool {
        self.entries.write(|entries| {
            sanitize_entries(entries);
            let id = token(value);
            match entries.get(&id) {
                Some(existing) if existing.ptr_eq(&Arc::downgrade(value)) => false,
                _ => {
                    entries.insert(id, Arc::downgrade(value));
                    true
                }
            }
        })
    }

    /// Stop tracking `value`
    pub fn remove(&self, value: &Arc<T>) -> bool {
        self.entries.write(|entries| {
            sanitize_entries(entries);
            entries.remove(&token(value)).is_some()
        })
    }

    /// Check whether this exact allocation is tracked and alive
    pub fn contains(&self, value: &Arc<T>) -> bool {
        self.entries.read(|entries| {
            entries
                .get(&token(value))
                .and_then(Weak::upgrade)
                .is_some_and(|live| Arc::ptr_eq(&live, value))
        })
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries
            .read(|entries| entries.values().filter(|w| w.strong_count() > 0).count())
    }

    /// Check if no live entries remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strong references to every live entry
    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.entries
            .read(|entries| entries.values().filter_map(Weak::upgrade).collect())
    }

    /// Drop dead entries
    ///
    /// # Returns
    /// * `usize` - number of entries dropped
    pub fn sanitize(&self) -> usize {
        self.entries.write(sanitize_entries)
    }

    /// Number of stored entries, dead ones included
    pub fn raw_len(&self) -> usize {
        self.entries.read(HashMap::len)
    }
}

impl<T> Default for WeakSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
