// Connection Handler Port
// One request in, one response out, connection released on return

use crate::domain::ConnectionHandle;
use std::io;
use thiserror::Error;

/// Handler errors
///
/// Reported to the worker for logging only; they never leave the worker.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Read failed: {0}")]
    Read(#[source] io::Error),

    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Connection Handler trait
///
/// The handler takes ownership of the connection, so the resource is released
/// when `handle` returns, whether it succeeds, fails or unwinds.
///
/// Implementations:
/// - HttpResponder (harbor-infra-net): minimal HTTP/1.1 responder
/// - MockConnectionHandler (mocks): scripted outcomes for tests
pub trait ConnectionHandler<C>: Send + Sync {
    /// Serve one connection to completion
    ///
    /// # Errors
    /// - HandlerError::Read / Write on socket failures
    /// - HandlerError::Rejected if the request could not be served
    fn handle(&self, conn: ConnectionHandle<C>) -> Result<(), HandlerError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use parking_lot::{Condvar, Mutex};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Shared log of released connection tags
    #[derive(Clone, Default)]
    pub struct ReleaseCounter {
        released: Arc<Mutex<Vec<u32>>>,
    }

    impl ReleaseCounter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn total(&self) -> usize {
            self.released.lock().len()
        }

        pub fn count_for(&self, tag: u32) -> usize {
            self.released.lock().iter().filter(|t| **t == tag).count()
        }

        pub fn released(&self) -> Vec<u32> {
            self.released.lock().clone()
        }
    }

    /// Stand-in for a socket: records its release on drop
    pub struct TrackedConnection {
        tag: u32,
        counter: ReleaseCounter,
    }

    impl TrackedConnection {
        pub fn new(tag: u32, counter: &ReleaseCounter) -> Self {
            Self {
                tag,
                counter: counter.clone(),
            }
        }

        pub fn tag(&self) -> u32 {
            self.tag
        }
    }

    impl Drop for TrackedConnection {
        fn drop(&mut self) {
            self.counter.released.lock().push(self.tag);
        }
    }

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Serve the connection
        Success,
        /// Return HandlerError::Rejected with message
        Fail(String),
        /// Panic with message after touching the connection
        Panic(String),
        /// Sleep for N ms, then succeed
        Delay(u64),
    }

    /// Blocks handler calls until the test hands out permits
    #[derive(Default)]
    pub struct HandlerGate {
        state: Mutex<GateState>,
        changed: Condvar,
    }

    #[derive(Default)]
    struct GateState {
        permits: usize,
        open: bool,
        waiting: usize,
    }

    impl HandlerGate {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Let `n` more handler calls through
        pub fn release(&self, n: usize) {
            self.state.lock().permits += n;
            self.changed.notify_all();
        }

        /// Let every current and future call through
        pub fn open(&self) {
            self.state.lock().open = true;
            self.changed.notify_all();
        }

        /// Number of calls currently parked at the gate
        pub fn waiting(&self) -> usize {
            self.state.lock().waiting
        }

        /// Block until at least `n` calls are parked, or `timeout` elapses
        pub fn wait_for_waiting(&self, n: usize, timeout: Duration) -> bool {
            let deadline = Instant::now() + timeout;
            let mut state = self.state.lock();
            while state.waiting < n {
                if self.changed.wait_until(&mut state, deadline).timed_out() {
                    return state.waiting >= n;
                }
            }
            true
        }

        fn pass(&self) {
            let mut state = self.state.lock();
            state.waiting += 1;
            self.changed.notify_all();
            while state.permits == 0 && !state.open {
                self.changed.wait(&mut state);
            }
            if !state.open {
                state.permits -= 1;
            }
            state.waiting -= 1;
            self.changed.notify_all();
        }
    }

    /// Mock Connection Handler for testing
    pub struct MockConnectionHandler {
        script: Mutex<VecDeque<MockBehavior>>,
        fallback: MockBehavior,
        gate: Option<Arc<HandlerGate>>,
        handled: Mutex<Vec<u32>>,
        call_count: Mutex<usize>,
    }

    impl MockConnectionHandler {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: behavior,
                gate: None,
                handled: Mutex::new(Vec::new()),
                call_count: Mutex::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        /// Use `script` for the first calls, then fall back to success
        pub fn scripted(script: Vec<MockBehavior>) -> Self {
            let handler = Self::new_success();
            *handler.script.lock() = script.into();
            handler
        }

        /// Park every call at `gate` before acting
        pub fn with_gate(mut self, gate: Arc<HandlerGate>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock()
        }

        /// Tags of connections served successfully, in completion order
        pub fn handled(&self) -> Vec<u32> {
            self.handled.lock().clone()
        }
    }

    impl ConnectionHandler<TrackedConnection> for MockConnectionHandler {
        fn handle(&self, conn: ConnectionHandle<TrackedConnection>) -> Result<(), HandlerError> {
            *self.call_count.lock() += 1;

            if let Some(gate) = &self.gate {
                gate.pass();
            }

            let behavior = self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            let tag = conn.stream().tag();

            match behavior {
                MockBehavior::Success => {}
                MockBehavior::Fail(msg) => return Err(HandlerError::Rejected(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{} (tag {})", msg, tag); // Actually panic for panic isolation testing
                }
                MockBehavior::Delay(ms) => std::thread::sleep(Duration::from_millis(ms)),
            }

            self.handled.lock().push(tag);
            Ok(())
        }
    }
}
