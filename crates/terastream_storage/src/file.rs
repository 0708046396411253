//! # Filesystem Chunk Store
//!
//! One file per chunk position:
//!
//! ```text
//! <root>/chunk_{x}_{y}_{z}.tch     // [compression id][compressed chunk]
//! ```
//!
//! ## Durability
//!
//! `put` writes a `.tmp` sibling and renames it over the target, so a crash
//! mid-write leaves either the old file or the new one, never a torn file.
//! Leftover `.tmp` files are removed when the store is opened.
//!
//! ## Concurrency
//!
//! Operations on one position serialize on one of `LOCK_STRIPES` mutexes.
//! Different positions proceed in parallel, so worker threads can save
//! chunks while the simulation loads others.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use terastream_core::{Chunk, ChunkCoord};

use crate::compression::{seal, unseal, Compression};
use crate::error::{StoreError, StoreResult};
use crate::store::ChunkStore;

/// Number of per-position lock stripes.
const LOCK_STRIPES: usize = 64;

/// Extension of chunk files.
pub const CHUNK_EXTENSION: &str = "tch";

const TEMP_EXTENSION: &str = "tmp";

/// File name for the chunk at `coord`.
#[must_use]
pub fn chunk_file_name(coord: ChunkCoord) -> String {
    format!("chunk_{}_{}_{}.{CHUNK_EXTENSION}", coord.x, coord.y, coord.z)
}

/// Parses a name produced by [`chunk_file_name`].
#[must_use]
pub fn parse_chunk_file_name(name: &str) -> Option<ChunkCoord> {
    let stem = name
        .strip_prefix("chunk_")?
        .strip_suffix(CHUNK_EXTENSION)?
        .strip_suffix('.')?;
    let mut parts = stem.split('_');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(ChunkCoord::new(x, y, z))
}

/// Chunk store writing one file per position under a root directory.
pub struct FileChunkStore<C: Compression> {
    root: PathBuf,
    compression: C,
    /// Known files and their sizes.
    index: RwLock<HashMap<ChunkCoord, u64>>,
    stripes: Box<[Mutex<()>]>,
    /// `fsync` every file before renaming it into place.
    sync_writes: bool,
    disposed: AtomicBool,
}

impl<C: Compression> FileChunkStore<C> {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// Existing chunk files are indexed so `contains`/`size` cover chunks
    /// from earlier runs.
    ///
    /// # Errors
    ///
    /// `Disk` if the directory cannot be created or listed.
    pub fn open(root: impl Into<PathBuf>, compression: C) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::disk(&root, e))?;

        let mut index = HashMap::new();
        let listing = fs::read_dir(&root).map_err(|e| StoreError::disk(&root, e))?;
        for entry in listing {
            let entry = entry.map_err(|e| StoreError::disk(&root, e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                tracing::warn!(path = %path.display(), "removing interrupted chunk write");
                fs::remove_file(&path).map_err(|e| StoreError::disk(&path, e))?;
                continue;
            }
            if let Some(coord) = parse_chunk_file_name(name) {
                let len = entry.metadata().map_err(|e| StoreError::disk(&path, e))?.len();
                index.insert(coord, len);
            }
        }

        tracing::info!(root = %root.display(), chunks = index.len(), "opened file chunk store");
        Ok(Self {
            root,
            compression,
            index: RwLock::new(index),
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            sync_writes: false,
            disposed: AtomicBool::new(false),
        })
    }

    /// Enables `fsync` before each rename.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `coord`.
    #[must_use]
    pub fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.root.join(chunk_file_name(coord))
    }

    fn stripe(&self, coord: ChunkCoord) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        coord.hash(&mut hasher);
        &self.stripes[hasher.finish() as usize % self.stripes.len()]
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let temp = path.with_extension(TEMP_EXTENSION);
        let result = self.write_temp(&temp, bytes).and_then(|()| fs::rename(&temp, path));
        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %temp.display(), error = %e, "failed to remove temp chunk file");
                }
            }
        }
        result
    }

    fn write_temp(&self, temp: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = File::create(temp)?;
        file.write_all(bytes)?;
        if self.sync_writes {
            file.sync_all()?;
        }
        Ok(())
    }
}

impl<C: Compression> ChunkStore for FileChunkStore<C> {
    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        self.check_open()?;
        let coord = chunk.coord();
        let envelope = seal(&self.compression, chunk)?;
        let path = self.path_for(coord);

        let _guard = self.stripe(coord).lock();
        self.write_atomic(&path, &envelope)
            .map_err(|e| StoreError::disk(&path, e))?;
        self.index.write().insert(coord, envelope.len() as u64);
        tracing::debug!(%coord, bytes = envelope.len(), "stored chunk file");
        Ok(())
    }

    fn get(&self, coord: ChunkCoord) -> StoreResult<Option<Chunk>> {
        self.check_open()?;
        let path = self.path_for(coord);

        let bytes = {
            let _guard = self.stripe(coord).lock();
            match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.index.write().remove(&coord);
                    return Ok(None);
                }
                Err(e) => return Err(StoreError::disk(&path, e)),
            }
        };

        match unseal(&self.compression, coord, &bytes) {
            Ok(chunk) => {
                tracing::debug!(%coord, bytes = bytes.len(), "loaded chunk file");
                Ok(Some(chunk))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt chunk file");
                Err(e)
            }
        }
    }

    fn contains(&self, coord: ChunkCoord) -> bool {
        !self.disposed.load(Ordering::Acquire) && self.index.read().contains_key(&coord)
    }

    fn remove(&self, coord: ChunkCoord) -> StoreResult<bool> {
        self.check_open()?;
        let path = self.path_for(coord);
        let _guard = self.stripe(coord).lock();
        let existed = match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(StoreError::disk(&path, e)),
        };
        self.index.write().remove(&coord);
        Ok(existed)
    }

    fn size(&self) -> usize {
        if self.disposed.load(Ordering::Acquire) {
            return 0;
        }
        self.index.read().values().sum::<u64>() as usize
    }

    fn len(&self) -> usize {
        if self.disposed.load(Ordering::Acquire) {
            0
        } else {
            self.index.read().len()
        }
    }

    fn dispose(&self) {
        let mut index = self.index.write();
        self.disposed.store(true, Ordering::Release);
        index.clear();
        tracing::info!(root = %self.root.display(), "disposed file chunk store");
    }
}
