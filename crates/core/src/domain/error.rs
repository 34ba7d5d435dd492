// Domain Error Types

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid queue capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Returned by `enqueue` once the queue is closed. Carries the rejected item
/// back to the caller so it is never silently dropped.
pub struct QueueClosed<T>(pub T);

impl<T> QueueClosed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> fmt::Display for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("task queue is closed")
    }
}

impl<T> std::error::Error for QueueClosed<T> {}

/// Non-blocking enqueue failure
pub enum TryEnqueueError<T> {
    /// Every slot is occupied
    Full(T),
    /// The queue no longer accepts items
    Closed(T),
}

impl<T> TryEnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryEnqueueError::Full(item) | TryEnqueueError::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TryEnqueueError::Full(_))
    }
}

impl<T> fmt::Debug for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryEnqueueError::Full(_) => f.write_str("Full(..)"),
            TryEnqueueError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryEnqueueError::Full(_) => f.write_str("task queue is full"),
            TryEnqueueError::Closed(_) => f.write_str("task queue is closed"),
        }
    }
}

impl<T> std::error::Error for TryEnqueueError<T> {}
