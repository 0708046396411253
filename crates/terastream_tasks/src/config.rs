//! # Task Queue Configuration
//!
//! ```toml
//! [tasks]
//! workers = 4
//! queue_capacity = 256
//! ```

use serde::{Deserialize, Serialize};

/// Worker pool sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    /// Number of worker threads. Zero is treated as one.
    pub workers: usize,
    /// Capacity of each worker's queue. `submit` blocks while it is full.
    pub queue_capacity: usize,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

impl TaskQueueConfig {
    /// Production sizing.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
        }
    }

    /// Worker count actually spawned.
    #[must_use]
    pub const fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            1
        } else {
            self.workers
        }
    }
}
