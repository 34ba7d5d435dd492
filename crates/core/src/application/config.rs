// Pool Configuration

use super::worker::constants::{DEFAULT_POOL_SIZE, DEFAULT_QUEUE_CAPACITY};
use crate::error::{AppError, Result};

/// Worker pool sizing (N workers, queue capacity C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl PoolConfig {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers,
            queue_capacity,
        }
    }

    /// # Errors
    /// - AppError::Config if either value is zero
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(AppError::Config(
                "worker count must be greater than 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(AppError::Config(
                "queue capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_POOL_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
