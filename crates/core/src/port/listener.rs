// Listener Port
// Source of accepted connections for the accept loop

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A freshly accepted connection, before it gets an id
#[derive(Debug)]
pub struct Incoming<C> {
    pub stream: C,
    pub peer: Option<SocketAddr>,
}

impl<C> Incoming<C> {
    pub fn new(stream: C, peer: Option<SocketAddr>) -> Self {
        Self { stream, peer }
    }
}

/// Accept errors
#[derive(Error, Debug)]
pub enum AcceptError {
    /// One accept call failed; the next one may succeed
    #[error("Accept failed: {0}")]
    Transient(#[from] io::Error),

    /// The call returned without a connection (see `Listener::wake`)
    #[error("Accept interrupted")]
    Interrupted,

    /// No more connections will ever be produced
    #[error("Listener closed")]
    Closed,
}

/// Listener trait
///
/// Implementations:
/// - TcpAcceptor (harbor-infra-net): std TCP listener
/// - ScriptedListener (mocks): connections pushed from a test
pub trait Listener: Send + Sync {
    /// Connection resource; released when dropped
    type Conn: Send + 'static;

    /// Block until the next connection arrives
    ///
    /// # Errors
    /// - AcceptError::Transient if this attempt failed (caller retries)
    /// - AcceptError::Interrupted if woken up without a connection
    /// - AcceptError::Closed if the listener is exhausted
    fn accept(&self) -> Result<Incoming<Self::Conn>, AcceptError>;

    /// Unblock a thread parked in `accept`, used during shutdown.
    fn wake(&self) -> io::Result<()> {
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::mpsc;

    enum ScriptEvent<C> {
        Connection(Incoming<C>),
        Failure(io::ErrorKind),
        Interrupt,
        Close,
    }

    /// Test side of a `ScriptedListener`
    pub struct ListenerFeed<C> {
        tx: mpsc::Sender<ScriptEvent<C>>,
    }

    impl<C> Clone for ListenerFeed<C> {
        fn clone(&self) -> Self {
            Self {
                tx: self.tx.clone(),
            }
        }
    }

    impl<C> ListenerFeed<C> {
        /// Make `conn` the next accepted connection
        pub fn push(&self, conn: C) {
            let _ = self.tx.send(ScriptEvent::Connection(Incoming::new(conn, None)));
        }

        /// Make the next accept fail with `kind`
        pub fn fail(&self, kind: io::ErrorKind) {
            let _ = self.tx.send(ScriptEvent::Failure(kind));
        }

        /// Make every later accept report `Closed`
        pub fn close(&self) {
            let _ = self.tx.send(ScriptEvent::Close);
        }
    }

    /// Listener whose connections are pushed through a `ListenerFeed`
    pub struct ScriptedListener<C> {
        rx: Mutex<mpsc::Receiver<ScriptEvent<C>>>,
        waker: Mutex<mpsc::Sender<ScriptEvent<C>>>,
        closed: Mutex<bool>,
    }

    impl<C: Send + 'static> ScriptedListener<C> {
        pub fn channel() -> (ListenerFeed<C>, Self) {
            let (tx, rx) = mpsc::channel();
            let listener = Self {
                rx: Mutex::new(rx),
                waker: Mutex::new(tx.clone()),
                closed: Mutex::new(false),
            };
            (ListenerFeed { tx }, listener)
        }
    }

    impl<C: Send + 'static> Listener for ScriptedListener<C> {
        type Conn = C;

        fn accept(&self) -> Result<Incoming<C>, AcceptError> {
            if *self.closed.lock() {
                return Err(AcceptError::Closed);
            }

            let event = self.rx.lock().recv();
            match event {
                Ok(ScriptEvent::Connection(incoming)) => Ok(incoming),
                Ok(ScriptEvent::Failure(kind)) => {
                    Err(AcceptError::Transient(io::Error::new(kind, "scripted failure")))
                }
                Ok(ScriptEvent::Interrupt) => Err(AcceptError::Interrupted),
                Ok(ScriptEvent::Close) | Err(_) => {
                    *self.closed.lock() = true;
                    Err(AcceptError::Closed)
                }
            }
        }

        fn wake(&self) -> io::Result<()> {
            let _ = self.waker.lock().send(ScriptEvent::Interrupt);
            Ok(())
        }
    }
}
