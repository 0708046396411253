//! # Chunk Store Contract
//!
//! A `ChunkStore` is a key-value persistence/cache layer keyed by chunk
//! position. Every backend satisfies the same round-trip contract:
//!
//! ```text
//! put(c); get(c.coord()) == Some(c)   // field-for-field
//! ```
//!
//! `get` on a never-stored position is `Ok(None)`. Corrupt bytes are a
//! distinct `CorruptData` error. Once `dispose` is called every fallible
//! operation returns `Disposed`.

use terastream_core::{Chunk, ChunkCoord};

use crate::error::StoreResult;

/// Pluggable chunk persistence.
///
/// Implementations are internally synchronized and may be shared between
/// the simulation thread and chunk workers behind an `Arc`.
pub trait ChunkStore: Send + Sync {
    /// Stores `chunk`, replacing any entry at its position.
    ///
    /// # Errors
    ///
    /// Backend-specific write failure, or `Disposed`.
    fn put(&self, chunk: &Chunk) -> StoreResult<()>;

    /// Loads the chunk at `coord`, or `None` if it was never stored.
    ///
    /// # Errors
    ///
    /// `CorruptData` for undecodable entries, backend read failure, or `Disposed`.
    fn get(&self, coord: ChunkCoord) -> StoreResult<Option<Chunk>>;

    /// Returns true if an entry exists at `coord`. False once disposed.
    fn contains(&self, coord: ChunkCoord) -> bool;

    /// Evicts the entry at `coord`. Returns true if one existed.
    ///
    /// # Errors
    ///
    /// Backend-specific failure, or `Disposed`.
    fn remove(&self, coord: ChunkCoord) -> StoreResult<bool>;

    /// Approximate stored bytes. Zero once disposed.
    fn size(&self) -> usize;

    /// Number of stored entries. Zero once disposed.
    fn len(&self) -> usize;

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases all resources. In-memory entries are dropped; files on disk
    /// stay where they are.
    fn dispose(&self);
}
