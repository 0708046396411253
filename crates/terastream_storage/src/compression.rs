//! # Compression Strategies
//!
//! Every stored chunk is wrapped in an envelope:
//!
//! ```text
//! [compression id: u8][compressed chunk bytes]
//! ```
//!
//! The id lets a store detect bytes written by a different strategy.
//!
//! | strategy            | id | crate      |
//! |---------------------|----|------------|
//! | `NoCompression`     | 0  | -          |
//! | `Lz4Compression`    | 1  | `lz4_flex` |
//! | `ZstdCompression`   | 2  | `zstd`     |

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};
use terastream_core::{Chunk, ChunkCoord};

use crate::error::{StoreError, StoreResult};

/// Default zstd level. Fast with a decent ratio on voxel data.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// A byte-level compression strategy.
pub trait Compression: Send + Sync + 'static {
    /// Envelope id written in front of every payload.
    fn id(&self) -> u8;

    /// Compresses `data`.
    ///
    /// # Errors
    ///
    /// `StoreError::Compression` if the backend fails.
    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>>;

    /// Decompresses `data`. Errors are reported as plain strings and turned
    /// into `CorruptData` by the caller, who knows the chunk position.
    ///
    /// # Errors
    ///
    /// Any decoding failure.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, String>;
}

/// Stores chunk bytes as they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCompression;

impl Compression for NoCompression {
    fn id(&self) -> u8 {
        0
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        Ok(data.to_vec())
    }
}

/// LZ4 block format with the uncompressed size prepended.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lz4Compression;

impl Compression for Lz4Compression {
    fn id(&self) -> u8 {
        1
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(compress_prepend_size(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        decompress_size_prepended(data).map_err(|e| e.to_string())
    }
}

/// Zstandard at a configurable level.
#[derive(Clone, Copy, Debug)]
pub struct ZstdCompression {
    /// Compression level (1..=22).
    pub level: i32,
}

impl ZstdCompression {
    /// Creates a strategy with the given level.
    #[must_use]
    pub const fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompression {
    fn default() -> Self {
        Self::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl Compression for ZstdCompression {
    fn id(&self) -> u8 {
        2
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        zstd::encode_all(data, self.level).map_err(|e| StoreError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        zstd::decode_all(data).map_err(|e| e.to_string())
    }
}

/// Compression choice in configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// [`NoCompression`].
    None,
    /// [`Lz4Compression`].
    #[default]
    Lz4,
    /// [`ZstdCompression`].
    Zstd,
}

/// Encodes, compresses and wraps a chunk in an envelope.
///
/// # Errors
///
/// `StoreError::Compression` if the backend fails.
pub fn seal<C: Compression + ?Sized>(compression: &C, chunk: &Chunk) -> StoreResult<Vec<u8>> {
    let compressed = compression.compress(&chunk.encode())?;
    let mut envelope = Vec::with_capacity(compressed.len() + 1);
    envelope.push(compression.id());
    envelope.extend_from_slice(&compressed);
    Ok(envelope)
}

/// Unwraps an envelope written by [`seal`] for the chunk at `coord`.
///
/// # Errors
///
/// `StoreError::CorruptData` on an empty envelope, a foreign compression id,
/// a decompression failure, a chunk decoding failure, or a chunk whose own
/// position differs from `coord`.
pub fn unseal<C: Compression + ?Sized>(
    compression: &C,
    coord: ChunkCoord,
    envelope: &[u8],
) -> StoreResult<Chunk> {
    let corrupt = |reason: String| StoreError::CorruptData { coord, reason };

    let (&id, payload) = envelope
        .split_first()
        .ok_or_else(|| corrupt("empty envelope".to_string()))?;
    if id != compression.id() {
        return Err(corrupt(format!(
            "compression id {id}, expected {}",
            compression.id()
        )));
    }
    let raw = compression.decompress(payload).map_err(corrupt)?;
    let chunk = Chunk::decode(&raw).map_err(|e| corrupt(e.to_string()))?;
    if chunk.coord() != coord {
        return Err(corrupt(format!("envelope holds chunk {}", chunk.coord())));
    }
    Ok(chunk)
}
