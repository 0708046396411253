//! # Chunk Arena
//!
//! Owns every loaded chunk behind its own `Arc<Mutex<Chunk>>`, keyed by
//! position. Neighbour access is a map lookup, not a pointer.
//!
//! ## Lock Order
//!
//! Code that needs several chunks at once goes through
//! [`ChunkArena::lock_region`], which locks them in ascending `ChunkCoord`
//! order. With every caller using the same order, two propagations sharing
//! a border cannot deadlock.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex, RwLock};
use terastream_core::{Chunk, ChunkCoord, Region3};

/// Shared handle to one loaded chunk.
pub type ChunkHandle = Arc<Mutex<Chunk>>;

/// Owned lock on one chunk.
pub type ChunkGuard = ArcMutexGuard<RawMutex, Chunk>;

/// Map of loaded chunks.
#[derive(Default)]
pub struct ChunkArena {
    chunks: RwLock<HashMap<ChunkCoord, ChunkHandle>>,
}

impl ChunkArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a chunk, returning the handle it replaced.
    pub fn insert(&self, chunk: Chunk) -> Option<ChunkHandle> {
        let coord = chunk.coord();
        self.chunks.write().insert(coord, Arc::new(Mutex::new(chunk)))
    }

    /// Inserts a chunk only if its position is empty.
    ///
    /// Returns false, dropping `chunk`, if a chunk is already loaded there.
    pub fn insert_if_vacant(&self, chunk: Chunk) -> bool {
        match self.chunks.write().entry(chunk.coord()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(chunk)));
                true
            }
        }
    }

    /// Handle for the chunk at `coord`.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.chunks.read().get(&coord).cloned()
    }

    /// Removes and returns the chunk at `coord`.
    pub fn remove(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.chunks.write().remove(&coord)
    }

    /// Returns true if a chunk is loaded at `coord`.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.read().contains_key(&coord)
    }

    /// Number of loaded chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Returns true if no chunk is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Loaded positions in ascending order.
    #[must_use]
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.chunks.read().keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Locks every loaded chunk intersecting `region`, in ascending order.
    ///
    /// Absent chunks are skipped; views over the result report them as
    /// unavailable. The arena map lock is released before any chunk lock is
    /// taken.
    #[must_use]
    pub fn lock_region(&self, region: Region3) -> LockedChunks {
        let handles: Vec<(ChunkCoord, ChunkHandle)> = {
            let chunks = self.chunks.read();
            region
                .chunks()
                .into_iter()
                .filter_map(|coord| chunks.get(&coord).map(|h| (coord, Arc::clone(h))))
                .collect()
        };
        let guards = handles
            .into_iter()
            .map(|(coord, handle)| (coord, handle.lock_arc()))
            .collect();
        LockedChunks { guards }
    }
}

/// A set of chunks locked in canonical order. Unlocks on drop.
pub struct LockedChunks {
    /// Sorted by coordinate.
    guards: Vec<(ChunkCoord, ChunkGuard)>,
}

impl LockedChunks {
    fn position(&self, coord: ChunkCoord) -> Option<usize> {
        self.guards.binary_search_by_key(&coord, |(c, _)| *c).ok()
    }

    /// The locked chunk at `coord`.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.position(coord).map(|i| &*self.guards[i].1)
    }

    /// Mutable access to the locked chunk at `coord`.
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.position(coord).map(|i| &mut *self.guards[i].1)
    }

    /// Locked positions in ascending order.
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.guards.iter().map(|(c, _)| *c)
    }

    /// Number of locked chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns true if nothing is locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}
