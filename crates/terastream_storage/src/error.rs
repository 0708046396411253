//! # Storage Error Types
//!
//! Failures raised by chunk stores. "Never stored" is not an error:
//! `get` returns `Ok(None)` for it.

use std::io;
use std::path::PathBuf;

use terastream_core::ChunkCoord;
use thiserror::Error;

/// Errors that can occur while storing or loading chunks.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure. Never reported as "not found".
    #[error("disk error at {path}: {source}")]
    Disk {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Stored bytes exist but cannot be turned back into a chunk.
    #[error("corrupt data for chunk {coord}: {reason}")]
    CorruptData {
        /// Chunk position being read.
        coord: ChunkCoord,
        /// What was wrong.
        reason: String,
    },

    /// A compression backend failed while encoding.
    #[error("compression failed: {0}")]
    Compression(String),

    /// The store was disposed.
    #[error("store has been disposed")]
    Disposed,
}

impl StoreError {
    /// Wraps an I/O error with the path it happened at.
    pub fn disk(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Disk {
            path: path.into(),
            source,
        }
    }

    /// Returns true for [`StoreError::CorruptData`].
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptData { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
