//! Approximate byte cost of values for capacity accounting
//!
//! The estimate is the inline size of the value plus any heap payload it
//! owns directly. It is not an exact memory footprint: allocator overhead and
//! spare capacity are ignored.

use std::collections::{HashMap, HashSet, VecDeque};
use std::mem;
use std::sync::Arc;

/// Fallback estimate for values that do not describe themselves: one
/// pointer-width slot
pub const DEFAULT_ESTIMATE: usize = mem::size_of::<usize>();

/// Values that can report an estimated storage size in bytes
///
/// The provided method returns [`DEFAULT_ESTIMATE`], so opting in with an
/// empty `impl` gives the fixed fallback.
pub trait EstimatedSize {
    /// Estimated storage size in bytes
    fn estimated_size(&self) -> usize {
        DEFAULT_ESTIMATE
    }
}

macro_rules! inline_size {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EstimatedSize for $ty {
                fn estimated_size(&self) -> usize {
                    mem::size_of::<$ty>()
                }
            }
        )*
    };
}

inline_size!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, ()
);

impl EstimatedSize for String {
    fn estimated_size(&self) -> usize {
        mem::size_of::<String>() + self.len()
    }
}

impl EstimatedSize for &str {
    fn estimated_size(&self) -> usize {
        mem::size_of::<&str>() + self.len()
    }
}

impl<T: EstimatedSize> EstimatedSize for Vec<T> {
    fn estimated_size(&self) -> usize {
        mem::size_of::<Vec<T>>() + self.iter().map(EstimatedSize::estimated_size).sum::<usize>()
    }
}

impl<T: EstimatedSize> EstimatedSize for VecDeque<T> {
    fn estimated_size(&self) -> usize {
        mem::size_of::<VecDeque<T>>()
            + self.iter().map(EstimatedSize::estimated_size).sum::<usize>()
    }
}

impl<T: EstimatedSize> EstimatedSize for Box<[T]> {
    fn estimated_size(&self) -> usize {
        mem::size_of::<Box<[T]>>() + self.iter().map(EstimatedSize::estimated_size).sum::<usize>()
    }
}

impl<T: EstimatedSize> EstimatedSize for Option<T> {
    fn estimated_size(&self) -> usize {
        match self {
            Some(value) => value.estimated_size(),
            None => mem::size_of::<Option<T>>(),
        }
    }
}

impl<T: EstimatedSize> EstimatedSize for Arc<T> {
    fn estimated_size(&self) -> usize {
        mem::size_of::<Arc<T>>() + (**self).estimated_size()
    }
}

impl<K: EstimatedSize, V: EstimatedSize, S> EstimatedSize for HashMap<K, V, S> {
    fn estimated_size(&self) -> usize {
        mem::size_of::<HashMap<K, V, S>>()
            + self
                .iter()
                .map(|(k, v)| k.estimated_size() + v.estimated_size())
                .sum::<usize>()
    }
}

impl<T: EstimatedSize, S> EstimatedSize for HashSet<T, S> {
    fn estimated_size(&self) -> usize {
        mem::size_of::<HashSet<T, S>>()
            + self.iter().map(EstimatedSize::estimated_size).sum::<usize>()
    }
}

impl<A: EstimatedSize, B: EstimatedSize> EstimatedSize for (A, B) {
    fn estimated_size(&self) -> usize {
        self.0.estimated_size() + self.1.estimated_size()
    }
}
