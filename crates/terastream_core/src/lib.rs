//! # TERASTREAM Core
//!
//! Voxel data structures shared by every other TERASTREAM crate.
//!
//! ## Design Principles
//!
//! 1. **Compact**: per-voxel fields are bit-packed at the narrowest width that fits
//! 2. **Never lossy**: a value that does not fit either widens the array or is refused
//! 3. **Explicit context**: block properties come from a `BlockRegistry` passed by `Arc`
//! 4. **Self-checking**: encoded chunks carry a magic, a version and a CRC32
//!
//! ## Core Components
//!
//! - `PackedVoxelArray`: bit-packed dense 3-D array ("tera array")
//! - `Chunk`: block, light, sunlight and liquid fields of a `32x64x32` cell
//! - `BlockRegistry`: translucency and luminance per block id
//! - `BlockPos` / `ChunkCoord` / `Region3`: coordinate spaces
//!
//! ## Example
//!
//! ```rust,ignore
//! use terastream_core::{BlockId, Chunk, ChunkCoord};
//!
//! let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
//! chunk.set_block(1, 2, 3, BlockId(4))?;
//! let bytes = chunk.encode();
//! assert_eq!(Chunk::decode(&bytes)?, chunk);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod block;
pub mod chunk;
pub mod coord;
pub mod error;
pub mod packed;

pub use block::{BlockDefinition, BlockId, BlockRegistry};
pub use chunk::{Chunk, ChunkState, LightField, BLOCK_BITS, CHUNK_DIMS, LIGHT_BITS, MAX_LIGHT};
pub use coord::{
    BlockPos, ChunkCoord, Extent3, Region3, Side, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z,
    CHUNK_VOLUME,
};
pub use error::{CoreError, CoreResult};
pub use packed::{bits_for, PackedVoxelArray, WidthPolicy, MAX_BITS};
