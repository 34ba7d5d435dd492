//! Fixed-size pool of OS worker threads.
//!
//! Every worker shares one [`TaskQueue`] and one [`ConnectionHandler`].
//! Whichever worker is idle when an item lands claims it; there is no
//! per-worker queue, priority or work stealing. Each in-flight connection
//! occupies its worker thread for the whole handler call.

use super::config::PoolConfig;
use super::worker::constants::WORKER_THREAD_PREFIX;
use super::worker::{PoolStats, PoolStatsSnapshot, Worker};
use crate::domain::{ConnectionHandle, TaskQueue};
use crate::error::Result;
use crate::port::ConnectionHandler;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

pub type ConnectionQueue<C> = TaskQueue<ConnectionHandle<C>>;

/// Running pool of `N` workers bound to one queue
pub struct WorkerPool<C> {
    queue: Arc<ConnectionQueue<C>>,
    stats: Arc<PoolStats>,
    workers: Vec<JoinHandle<()>>,
}

impl<C: Send + 'static> WorkerPool<C> {
    /// Spawn `config.workers` threads draining `queue` into `handler`.
    ///
    /// # Errors
    /// - AppError::Config if the config is invalid
    /// - AppError::Io if a thread cannot be spawned; workers already running are
    ///   stopped before returning
    pub fn start(
        config: &PoolConfig,
        queue: Arc<ConnectionQueue<C>>,
        handler: Arc<dyn ConnectionHandler<C>>,
    ) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(PoolStats::default());
        let mut pool = Self {
            queue,
            stats,
            workers: Vec::with_capacity(config.workers),
        };

        for worker_id in 0..config.workers {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&pool.queue),
                Arc::clone(&handler),
                Arc::clone(&pool.stats),
            );

            debug!(worker_id = worker.id(), "Spawning worker");
            let spawned = thread::Builder::new()
                .name(format!("{WORKER_THREAD_PREFIX}-{}", worker.id()))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    error!(worker_id, error = %e, "Failed to spawn worker thread");
                    pool.shutdown();
                    return Err(e.into());
                }
            }
        }

        info!(
            workers = config.workers,
            queue_capacity = pool.queue.capacity(),
            "Worker pool started"
        );
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn queue(&self) -> &Arc<ConnectionQueue<C>> {
        &self.queue
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the queue and join every worker.
    ///
    /// Workers finish their in-flight connection and drain whatever is still
    /// buffered before they exit, so no accepted connection is stranded.
    pub fn shutdown(self) -> PoolStatsSnapshot {
        debug!(buffered = self.queue.len(), "Closing task queue");
        self.queue.close();

        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!(worker_id, "Worker thread terminated abnormally");
            }
        }

        let stats = self.stats.snapshot();
        info!(
            handled = stats.handled,
            failed = stats.failed,
            panicked = stats.panicked,
            "Worker pool shutdown complete"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionId;
    use crate::port::connection_handler::mocks::{
        MockConnectionHandler, ReleaseCounter, TrackedConnection,
    };

    #[test]
    fn test_start_rejects_invalid_config() {
        let queue = Arc::new(ConnectionQueue::<TrackedConnection>::new(1).unwrap());
        let handler: Arc<dyn ConnectionHandler<TrackedConnection>> =
            Arc::new(MockConnectionHandler::new_success());

        let result = WorkerPool::start(&PoolConfig::new(0, 1), queue, handler);
        assert!(result.is_err());
    }

    #[test]
    fn test_pool_serves_and_shuts_down() {
        let counter = ReleaseCounter::new();
        let queue = Arc::new(ConnectionQueue::new(4).unwrap());
        let handler = Arc::new(MockConnectionHandler::new_success());

        let pool = WorkerPool::start(
            &PoolConfig::new(3, 4),
            Arc::clone(&queue),
            handler.clone() as Arc<dyn ConnectionHandler<TrackedConnection>>,
        )
        .unwrap();
        assert_eq!(pool.size(), 3);

        for tag in 0..20u32 {
            let conn = ConnectionHandle::new(
                ConnectionId::new(tag as u64),
                None,
                TrackedConnection::new(tag, &counter),
            );
            queue.enqueue(conn).unwrap();
        }

        let stats = pool.shutdown();

        assert_eq!(stats.handled, 20);
        assert_eq!(counter.total(), 20);
        let mut handled = handler.handled();
        handled.sort_unstable();
        assert_eq!(handled, (0..20).collect::<Vec<_>>());
    }
}
