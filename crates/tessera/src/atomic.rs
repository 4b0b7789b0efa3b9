//! Atomic integer counter

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counter with sequentially consistent operations
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    /// Create a counter starting at `value`
    pub fn new(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }

    /// Current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Overwrite the value
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Add one and return the new value
    pub fn increment(&self) -> u64 {
        self.add(1)
    }

    /// Add `n` and return the new value
    pub fn add(&self, n: u64) -> u64 {
        self.value.fetch_add(n, Ordering::SeqCst).wrapping_add(n)
    }

    /// Subtract one, saturating at zero, and return the new value
    pub fn decrement(&self) -> u64 {
        let previous = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_else(|n| n);
        previous.saturating_sub(1)
    }

    /// Store `new` if the current value equals `current`
    ///
    /// # Returns
    /// * `bool` - true if the swap happened
    pub fn compare_and_swap(&self, current: u64, new: u64) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Clone for AtomicCounter {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter_basic() {
        let counter = AtomicCounter::new(5);
        assert_eq!(counter.increment(), 6);
        assert_eq!(counter.decrement(), 5);
        counter.set(0);
        assert_eq!(counter.decrement(), 0);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_compare_and_swap() {
        let counter = AtomicCounter::new(1);
        assert!(!counter.compare_and_swap(2, 3));
        assert!(counter.compare_and_swap(1, 3));
        assert_eq!(counter.get(), 3);
    }

    #[test]
    fn test_concurrent_increment() {
        let counter = Arc::new(AtomicCounter::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.get(), 4000);
    }
}
