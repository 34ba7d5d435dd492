// Port Layer - Interfaces for external collaborators

pub mod connection_handler;
pub mod listener;

// Re-exports
pub use connection_handler::{ConnectionHandler, HandlerError};
pub use listener::{AcceptError, Incoming, Listener};
