//! # Lighting Error Types
//!
//! Every error here is a caller bug: the region handed to the propagator was
//! too small or did not have its chunks loaded. A pass that hits one is
//! rolled back before the error is returned.

use terastream_core::{BlockPos, ChunkCoord, CoreError, Region3};
use thiserror::Error;

/// Errors raised by world views and propagation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LightingError {
    /// Write or block lookup outside the view's declared region.
    #[error("position {pos} outside propagation region {region}")]
    OutsideRegion {
        /// Offending position.
        pos: BlockPos,
        /// Declared region.
        region: Region3,
    },

    /// The chunk holding `pos` is not loaded or not locked.
    #[error("chunk {chunk} for position {pos} is not available")]
    ChunkUnavailable {
        /// Offending position.
        pos: BlockPos,
        /// Chunk that was missing.
        chunk: ChunkCoord,
    },

    /// The chunk rejected the write.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for lighting operations.
pub type LightingResult<T> = Result<T, LightingError>;
