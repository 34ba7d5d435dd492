// Domain Layer - Queue and connection model

pub mod connection;
pub mod error;
pub mod queue;

// Re-exports
pub use connection::{ConnectionHandle, ConnectionId};
pub use error::{DomainError, QueueClosed, TryEnqueueError};
pub use queue::TaskQueue;
