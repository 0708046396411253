//! # In-Memory Chunk Stores
//!
//! Entries live in a `HashMap<ChunkCoord, Box<[u8]>>` behind a `RwLock`.
//! The compression strategy is a type parameter, which gives three
//! interchangeable backends:
//!
//! - [`UncompressedMemoryStore`]: baseline, also the correctness reference
//! - [`Lz4MemoryStore`]: fast compression
//! - [`ZstdMemoryStore`]: better ratio, more CPU

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use terastream_core::{Chunk, ChunkCoord};

use crate::compression::{seal, unseal, Compression, Lz4Compression, NoCompression, ZstdCompression};
use crate::error::{StoreError, StoreResult};
use crate::store::ChunkStore;

/// Chunk store keeping envelopes in memory.
pub struct MemoryChunkStore<C: Compression> {
    compression: C,
    entries: RwLock<HashMap<ChunkCoord, Box<[u8]>>>,
    /// Sum of envelope lengths.
    bytes: AtomicUsize,
    disposed: AtomicBool,
}

/// In-memory store without compression.
pub type UncompressedMemoryStore = MemoryChunkStore<NoCompression>;

/// In-memory store with LZ4 compression.
pub type Lz4MemoryStore = MemoryChunkStore<Lz4Compression>;

/// In-memory store with zstd compression.
pub type ZstdMemoryStore = MemoryChunkStore<ZstdCompression>;

impl<C: Compression> MemoryChunkStore<C> {
    /// Creates an empty store using `compression`.
    #[must_use]
    pub fn new(compression: C) -> Self {
        Self {
            compression,
            entries: RwLock::new(HashMap::new()),
            bytes: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<C: Compression + Default> Default for MemoryChunkStore<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: Compression> ChunkStore for MemoryChunkStore<C> {
    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        self.check_open()?;
        let envelope = seal(&self.compression, chunk)?.into_boxed_slice();
        let len = envelope.len();

        let mut entries = self.entries.write();
        // Re-check under the lock so a concurrent dispose cannot be missed
        self.check_open()?;
        if let Some(old) = entries.insert(chunk.coord(), envelope) {
            self.bytes.fetch_sub(old.len(), Ordering::Relaxed);
        }
        self.bytes.fetch_add(len, Ordering::Relaxed);
        tracing::debug!(coord = %chunk.coord(), bytes = len, "stored chunk in memory");
        Ok(())
    }

    fn get(&self, coord: ChunkCoord) -> StoreResult<Option<Chunk>> {
        self.check_open()?;
        let entries = self.entries.read();
        let Some(envelope) = entries.get(&coord) else {
            return Ok(None);
        };
        match unseal(&self.compression, coord, envelope) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(e) => {
                tracing::warn!(%coord, error = %e, "corrupt chunk in memory store");
                Err(e)
            }
        }
    }

    fn contains(&self, coord: ChunkCoord) -> bool {
        !self.disposed.load(Ordering::Acquire) && self.entries.read().contains_key(&coord)
    }

    fn remove(&self, coord: ChunkCoord) -> StoreResult<bool> {
        self.check_open()?;
        let removed = self.entries.write().remove(&coord);
        if let Some(old) = &removed {
            self.bytes.fetch_sub(old.len(), Ordering::Relaxed);
        }
        Ok(removed.is_some())
    }

    fn size(&self) -> usize {
        if self.disposed.load(Ordering::Acquire) {
            0
        } else {
            self.bytes.load(Ordering::Relaxed)
        }
    }

    fn len(&self) -> usize {
        if self.disposed.load(Ordering::Acquire) {
            0
        } else {
            self.entries.read().len()
        }
    }

    fn dispose(&self) {
        let mut entries = self.entries.write();
        self.disposed.store(true, Ordering::Release);
        entries.clear();
        self.bytes.store(0, Ordering::Relaxed);
    }
}
