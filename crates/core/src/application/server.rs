//! Server lifecycle: queue, worker pool and accept loop wired together.
//!
//! Startup order is queue, then workers, then the accept thread, so a
//! consumer exists before the first connection is produced. Shutdown runs in
//! reverse: stop accepting, then close the queue and let the workers drain
//! it.

use super::acceptor::{AcceptLoop, AcceptStats, StopReason};
use super::config::PoolConfig;
use super::pool::{ConnectionQueue, WorkerPool};
use super::worker::constants::ACCEPTOR_THREAD_NAME;
use super::worker::{shutdown_channel, PoolStatsSnapshot, ShutdownSender};
use crate::error::{AppError, Result};
use crate::port::{ConnectionHandler, Listener};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Final counters of a stopped server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub accept: AcceptStats,
    pub stop_reason: StopReason,
    pub pool: PoolStatsSnapshot,
}

pub struct Server;

impl Server {
    /// Start the worker pool, then the accept loop on its own thread.
    ///
    /// # Errors
    /// - AppError::Config for an invalid pool config
    /// - AppError::Io if a worker or the accept thread cannot be spawned
    pub fn start<L>(
        config: PoolConfig,
        listener: L,
        handler: Arc<dyn ConnectionHandler<L::Conn>>,
    ) -> Result<ServerHandle<L>>
    where
        L: Listener + 'static,
    {
        config.validate()?;

        let queue = Arc::new(ConnectionQueue::new(config.queue_capacity)?);
        let pool = WorkerPool::start(&config, Arc::clone(&queue), handler)?;

        let listener = Arc::new(listener);
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let spawned = {
            let listener = Arc::clone(&listener);
            let queue = Arc::clone(&queue);
            thread::Builder::new()
                .name(ACCEPTOR_THREAD_NAME.to_string())
                .spawn(move || {
                    AcceptLoop::new(listener.as_ref(), queue.as_ref(), shutdown_rx).run()
                })
        };

        let acceptor = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                pool.shutdown();
                return Err(e.into());
            }
        };

        info!(
            addr = ?listener.local_addr(),
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Server started"
        );

        Ok(ServerHandle {
            listener,
            queue,
            pool,
            acceptor,
            shutdown: shutdown_tx,
        })
    }
}

/// Handle to a running server
pub struct ServerHandle<L: Listener> {
    listener: Arc<L>,
    queue: Arc<ConnectionQueue<L::Conn>>,
    pool: WorkerPool<L::Conn>,
    acceptor: JoinHandle<(AcceptStats, StopReason)>,
    shutdown: ShutdownSender,
}

impl<L: Listener + 'static> ServerHandle<L> {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared task queue (observation only)
    pub fn queue(&self) -> &Arc<ConnectionQueue<L::Conn>> {
        &self.queue
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.pool.stats()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Block until the accept loop stops on its own (listener closed), then
    /// drain the pool.
    pub fn wait(self) -> Result<ShutdownReport> {
        let (accept, stop_reason) = join_acceptor(self.acceptor)?;
        let pool = self.pool.shutdown();
        Ok(ShutdownReport {
            accept,
            stop_reason,
            pool,
        })
    }

    /// Stop accepting, serve everything already accepted, join all threads.
    ///
    /// # Errors
    /// - AppError::Internal if the accept thread panicked (workers are still
    ///   drained and joined first)
    pub fn shutdown(self) -> Result<ShutdownReport> {
        info!(buffered = self.queue.len(), "Shutting down server");

        self.shutdown.shutdown();
        if let Err(e) = self.listener.wake() {
            // The loop still exits on its next accept
            warn!(error = %e, "Failed to wake accept loop");
        }

        let accepted = join_acceptor(self.acceptor);
        let pool = self.pool.shutdown();
        let (accept, stop_reason) = accepted?;

        info!(
            accepted = accept.accepted,
            handled = pool.handled,
            "Server stopped"
        );
        Ok(ShutdownReport {
            accept,
            stop_reason,
            pool,
        })
    }
}

fn join_acceptor(
    handle: JoinHandle<(AcceptStats, StopReason)>,
) -> Result<(AcceptStats, StopReason)> {
    handle
        .join()
        .map_err(|_| AppError::Internal("accept loop panicked".to_string()))
}
