// Worker - Connection handling loop

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::{ConnectionHandle, TaskQueue};
use crate::port::ConnectionHandler;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Live counters shared by every worker of a pool
#[derive(Debug, Default)]
pub struct PoolStats {
    handled: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

impl PoolStats {
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            handled: self.handled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Handled => &self.handled,
            Outcome::Failed => &self.failed,
            Outcome::Panicked => &self.panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of `PoolStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub handled: u64,
    pub failed: u64,
    pub panicked: u64,
}

impl PoolStatsSnapshot {
    /// Connections that reached a handler, whatever the result
    pub fn total(&self) -> u64 {
        self.handled + self.failed + self.panicked
    }
}

/// What happened to one dequeued connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Failed,
    Panicked,
}

/// Worker drains the shared queue, one connection at a time
pub struct Worker<C> {
    id: usize,
    queue: Arc<TaskQueue<ConnectionHandle<C>>>,
    handler: Arc<dyn ConnectionHandler<C>>,
    stats: Arc<PoolStats>,
}

impl<C: Send + 'static> Worker<C> {
    pub fn new(
        id: usize,
        queue: Arc<TaskQueue<ConnectionHandle<C>>>,
        handler: Arc<dyn ConnectionHandler<C>>,
        stats: Arc<PoolStats>,
    ) -> Self {
        Self {
            id,
            queue,
            handler,
            stats,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Run until the queue is closed and drained.
    ///
    /// `dequeue` is the only place the worker parks. Handler failures and
    /// panics are contained in `serve`, so only queue shutdown ends the loop.
    pub fn run(&self) {
        info!(worker_id = self.id, "Worker started");

        let mut served: u64 = 0;
        while let Some(conn) = self.queue.dequeue() {
            self.serve(conn);
            served += 1;
        }

        info!(worker_id = self.id, served, "Worker stopped");
    }

    /// Hand one connection to the handler and record the outcome
    pub fn serve(&self, conn: ConnectionHandle<C>) -> Outcome {
        let conn_id = conn.id();
        let span = info_span!("connection", conn_id = %conn_id, worker_id = self.id);
        let _enter = span.enter();

        debug!(
            peer = ?conn.peer(),
            queued_ms = conn.age().as_millis() as u64,
            "Connection dequeued"
        );

        // The closure owns `conn`: it is dropped on return or during unwinding.
        let handler = &self.handler;
        let outcome = match execute_guarded(AssertUnwindSafe(move || handler.handle(conn))) {
            PanicGuardResult::Success(Ok(())) => {
                debug!("Connection served");
                Outcome::Handled
            }
            PanicGuardResult::Success(Err(e)) => {
                warn!(error = %e, "Connection handler failed");
                Outcome::Failed
            }
            PanicGuardResult::Panicked(_) => Outcome::Panicked,
        };

        self.stats.record(outcome);
        outcome
    }
}
