// Harbor Core - Task queue, worker pool & ports
// NO network or protocol code (adapters live in harbor-infra-net)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
