// Application Layer - Pool lifecycle and accept loop

pub mod acceptor;
pub mod config;
pub mod pool;
pub mod server;
pub mod worker;

// Re-exports
pub use acceptor::{AcceptLoop, AcceptStats, StopReason};
pub use config::PoolConfig;
pub use pool::{ConnectionQueue, WorkerPool};
pub use server::{Server, ServerHandle, ShutdownReport};
pub use worker::{
    shutdown_channel, PoolStats, PoolStatsSnapshot, ShutdownSender, ShutdownToken, Worker,
};
