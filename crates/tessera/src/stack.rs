//! LIFO stack with a pluggable storage strategy
//!
//! The backing store is chosen at construction through the type parameter:
//! [`VecStorage`] (contiguous, the default), [`DequeStorage`] (ring buffer)
//! or [`LinkedStorage`] (node per element).

use std::collections::{LinkedList, VecDeque};
use std::fmt;

use crate::lock::Guarded;

/// Storage strategy for [`Stack`]
pub trait StackStorage<T>: Default {
    /// Push onto the top
    fn push(&mut self, value: T);

    /// Pop from the top
    fn pop(&mut self) -> Option<T>;

    /// Borrow the top
    fn peek(&self) -> Option<&T>;

    /// Number of stored values
    fn count(&self) -> usize;
}

/// Contiguous storage
#[derive(Debug, Clone)]
pub struct VecStorage<T>(Vec<T>);

impl<T> Default for VecStorage<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> StackStorage<T> for VecStorage<T> {
    fn push(&mut self, value: T) {
        self.0.push(value);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop()
    }

    fn peek(&self) -> Option<&T> {
        self.0.last()
    }

    fn count(&self) -> usize {
        self.0.len()
    }
}

/// Ring-buffer storage
#[derive(Debug, Clone)]
pub struct DequeStorage<T>(VecDeque<T>);

impl<T> Default for DequeStorage<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<T> StackStorage<T> for DequeStorage<T> {
    fn push(&mut self, value: T) {
        self.0.push_back(value);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop_back()
    }

    fn peek(&self) -> Option<&T> {
        self.0.back()
    }

    fn count(&self) -> usize {
        self.0.len()
    }
}

/// Linked-list storage
#[derive(Debug, Clone)]
pub struct LinkedStorage<T>(LinkedList<T>);

impl<T> Default for LinkedStorage<T> {
    fn default() -> Self {
        Self(LinkedList::new())
    }
}

impl<T> StackStorage<T> for LinkedStorage<T> {
    fn push(&mut self, value: T) {
        self.0.push_front(value);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop_front()
    }

    fn peek(&self) -> Option<&T> {
        self.0.front()
    }

    fn count(&self) -> usize {
        self.0.len()
    }
}

/// Thread-safe stack
pub struct Stack<T, S = VecStorage<T>> {
    storage: Guarded<S>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Stack<T> {
    /// Create an empty stack on contiguous storage
    pub fn new() -> Self {
        Self::with_storage(VecStorage::default())
    }
}

impl<T, S> Stack<T, S>
where
    S: StackStorage<T>,
{
    /// Create a stack on the given storage
    pub fn with_storage(storage: S) -> Self {
        Self {
            storage: Guarded::new(storage),
            _marker: std::marker::PhantomData,
        }
    }

    /// Push onto the top
    pub fn push(&self, value: T) {
        self.storage.write(|s| s.push(value))
    }

    /// Pop from the top
    pub fn pop(&self) -> Option<T> {
        self.storage.write(S::pop)
    }

    /// Copy of the top
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.storage.read(|s| s.peek().cloned())
    }

    /// Number of stored values
    pub fn count(&self) -> usize {
        self.storage.read(S::count)
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drop every value
    pub fn clear(&self) {
        self.storage.write(|s| *s = S::default())
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> fmt::Debug for Stack<T, S>
where
    S: StackStorage<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack").field("count", &self.count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn exercise<S: StackStorage<i32>>(stack: Stack<i32, S>) {
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);

        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.peek(), Some(3));
        assert_eq!(stack.count(), 3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));

        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_all_strategies_are_lifo() {
        exercise(Stack::new());
        exercise(Stack::with_storage(DequeStorage::default()));
        exercise(Stack::with_storage(LinkedStorage::default()));
    }

    #[test]
    fn test_concurrent_push_pop() {
        let stack = Arc::new(Stack::with_storage(LinkedStorage::default()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stack = Arc::clone(&stack);
                thread::spawn(move || {
                    for i in 0..500 {
                        stack.push(t * 1000 + i);
                    }
                    for _ in 0..250 {
                        assert!(stack.pop().is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stack.count(), 1000);
    }
}
