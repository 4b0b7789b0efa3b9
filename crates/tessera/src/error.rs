//! Error types for tessera

use std::fmt;

/// Result type alias for tessera operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for collection operations
///
/// Absence (a lookup miss, popping an empty container) is never an error and
/// is reported as `None` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A key was present in the order structure but missing from the data map
    /// while taking a traversal snapshot
    BadAccess,

    /// Positional insert requested on a set kept in sorted order
    SortedInsert,

    /// Attempt to switch a sorted set back to temporal order
    OrderingLocked,

    /// A capacity bound of zero was configured
    ZeroCapacity,

    /// Position outside the current sequence
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Length of the sequence at the time of the request
        len: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadAccess => write!(f, "Bad access: key missing from data snapshot"),
            Error::SortedInsert => write!(f, "Positional insert is not allowed in sorted mode"),
            Error::OrderingLocked => {
                write!(f, "Temporal order cannot be restored once a sort order is imposed")
            }
            Error::ZeroCapacity => write!(f, "Capacity must be greater than 0"),
            Error::IndexOutOfBounds { index, len } => {
                write!(f, "Index out of bounds: {} (len {})", index, len)
            }
        }
    }
}

impl std::error::Error for Error {}
