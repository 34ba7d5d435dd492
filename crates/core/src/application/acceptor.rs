// Accept Loop - producer side of the task queue
//
// Pulls connections from the Listener port and enqueues them. A full queue
// blocks this loop, which stops new accepts: that is the only backpressure.

use super::pool::ConnectionQueue;
use super::worker::ShutdownToken;
use crate::domain::{ConnectionHandle, ConnectionId, TryEnqueueError};
use crate::port::{AcceptError, Listener};
use tracing::{debug, info, warn};

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptStats {
    /// Connections handed to the queue
    pub accepted: u64,
    /// Accept calls that failed and were retried
    pub failed: u64,
    /// Connections dropped because the queue was already closed
    pub rejected: u64,
    /// Enqueues that found the queue full and waited for a free slot
    pub blocked: u64,
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    ListenerClosed,
    QueueClosed,
}

pub struct AcceptLoop<'a, L: Listener> {
    listener: &'a L,
    queue: &'a ConnectionQueue<L::Conn>,
    shutdown: ShutdownToken,
    next_id: u64,
    stats: AcceptStats,
}

impl<'a, L: Listener> AcceptLoop<'a, L> {
    pub fn new(
        listener: &'a L,
        queue: &'a ConnectionQueue<L::Conn>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            listener,
            queue,
            shutdown,
            next_id: 0,
            stats: AcceptStats::default(),
        }
    }

    /// Accept and enqueue until shutdown, listener exhaustion or queue close
    pub fn run(mut self) -> (AcceptStats, StopReason) {
        info!(addr = ?self.listener.local_addr(), "Accept loop started");

        let reason = loop {
            if self.shutdown.is_shutdown() {
                break StopReason::Shutdown;
            }

            match self.listener.accept() {
                Ok(incoming) => {
                    self.next_id += 1;
                    let conn = ConnectionHandle::new(
                        ConnectionId::new(self.next_id),
                        incoming.peer,
                        incoming.stream,
                    );

                    if let Some(reason) = self.dispatch(conn) {
                        break reason;
                    }
                }
                Err(AcceptError::Transient(e)) => {
                    // No backoff, no retry limit
                    warn!(error = %e, "Failed to accept client");
                    self.stats.failed += 1;
                }
                Err(AcceptError::Interrupted) => {
                    debug!("Accept interrupted");
                }
                Err(AcceptError::Closed) => break StopReason::ListenerClosed,
            }
        };

        info!(
            ?reason,
            accepted = self.stats.accepted,
            failed = self.stats.failed,
            rejected = self.stats.rejected,
            blocked = self.stats.blocked,
            "Accept loop stopped"
        );
        (self.stats, reason)
    }

    fn dispatch(&mut self, conn: ConnectionHandle<L::Conn>) -> Option<StopReason> {
        let conn_id = conn.id();
        debug!(conn_id = %conn_id, peer = ?conn.peer(), "New client connected");

        let queued = match self.queue.try_enqueue(conn) {
            Ok(()) => Ok(()),
            Err(TryEnqueueError::Full(conn)) => {
                // Backpressure: no accepts until a worker frees a slot
                self.stats.blocked += 1;
                debug!(conn_id = %conn_id, "Task queue full, waiting for a free slot");
                self.queue.enqueue(conn).map_err(|closed| closed.into_inner())
            }
            Err(TryEnqueueError::Closed(conn)) => Err(conn),
        };

        match queued {
            Ok(()) => {
                self.stats.accepted += 1;
                debug!(conn_id = %conn_id, queue_len = self.queue.len(), "Connection queued");
                None
            }
            Err(conn) => {
                warn!(conn_id = %conn_id, "Task queue closed, dropping connection");
                drop(conn);
                self.stats.rejected += 1;
                Some(StopReason::QueueClosed)
            }
        }
    }
}
