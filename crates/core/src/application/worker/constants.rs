// Worker constants (no magic values)
use std::time::Duration;

/// Default number of worker threads (N)
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default task queue capacity (C)
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8888;

/// Simulated workload per GET/POST request (5s)
pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on a single request read
pub const READ_BUFFER_SIZE: usize = 4096;

/// Thread name prefix for pool workers
pub const WORKER_THREAD_PREFIX: &str = "harbor-worker";

/// Thread name for the accept loop
pub const ACCEPTOR_THREAD_NAME: &str = "harbor-acceptor";
