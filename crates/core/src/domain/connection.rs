// Connection Domain Model

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Sequence number assigned by the accept loop (log correlation only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One accepted connection and its metadata.
///
/// The handle is owned by exactly one component at a time: the accept loop,
/// then the queue, then the worker that dequeued it, then the handler. It is
/// neither `Clone` nor `Copy`, so ownership can only move. Dropping the handle
/// drops `stream`, which releases the underlying resource.
pub struct ConnectionHandle<C> {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    accepted_at: Instant,
    stream: C,
}

impl<C> ConnectionHandle<C> {
    pub fn new(id: ConnectionId, peer: Option<SocketAddr>, stream: C) -> Self {
        Self {
            id,
            peer,
            accepted_at: Instant::now(),
            stream,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Time spent since accept (queue wait included)
    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }

    pub fn stream(&self) -> &C {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut C {
        &mut self.stream
    }

    pub fn into_stream(self) -> C {
        self.stream
    }
}

impl<C> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
