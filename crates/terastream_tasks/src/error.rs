//! # Task Queue Errors

use thiserror::Error;

/// Errors raised while submitting work or starting workers.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The queue was shut down, or every worker has exited.
    #[error("task queue is closed")]
    QueueClosed,

    /// The worker that owns the position has no room. Retry later.
    #[error("queue of worker {worker} is full")]
    QueueFull {
        /// Index of the worker.
        worker: usize,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        /// Index of the worker.
        worker: usize,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for task queue operations.
pub type TaskResult<T> = Result<T, TaskError>;
