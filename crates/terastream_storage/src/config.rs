//! # Storage Configuration
//!
//! Selects a backend and compression strategy, usually from the `[storage]`
//! table of a world TOML file:
//!
//! ```toml
//! [storage]
//! backend = "file"
//! compression = "zstd"
//! root = "saves/world1/chunks"
//! zstd_level = 3
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compression::{CompressionKind, Lz4Compression, NoCompression, ZstdCompression, DEFAULT_ZSTD_LEVEL};
use crate::error::StoreResult;
use crate::file::FileChunkStore;
use crate::memory::MemoryChunkStore;
use crate::store::ChunkStore;

/// Where chunks are kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process `HashMap`. Lost on exit.
    #[default]
    Memory,
    /// One file per chunk under `root`.
    File,
}

/// Configuration for the chunk store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind.
    pub backend: StorageBackend,
    /// Compression strategy.
    pub compression: CompressionKind,
    /// Root directory for the file backend.
    pub root: PathBuf,
    /// Level used when `compression = "zstd"`.
    pub zstd_level: i32,
    /// `fsync` each chunk file before it replaces the old one.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            compression: CompressionKind::Lz4,
            root: PathBuf::from("chunks"),
            zstd_level: DEFAULT_ZSTD_LEVEL,
            sync_writes: false,
        }
    }
}

impl StorageConfig {
    /// Production config: durable zstd-compressed files.
    #[must_use]
    pub fn production() -> Self {
        Self {
            backend: StorageBackend::File,
            compression: CompressionKind::Zstd,
            root: PathBuf::from("world/chunks"),
            zstd_level: DEFAULT_ZSTD_LEVEL,
            sync_writes: true,
        }
    }

    /// Config for a file store under `root` with default compression.
    #[must_use]
    pub fn file(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::File,
            root: root.into(),
            ..Self::default()
        }
    }
}

/// Builds the store described by `config`.
///
/// # Errors
///
/// `Disk` if the file backend cannot create or list its root directory.
pub fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn ChunkStore>> {
    let store: Arc<dyn ChunkStore> = match (config.backend, config.compression) {
        (StorageBackend::Memory, CompressionKind::None) => {
            Arc::new(MemoryChunkStore::new(NoCompression))
        }
        (StorageBackend::Memory, CompressionKind::Lz4) => {
            Arc::new(MemoryChunkStore::new(Lz4Compression))
        }
        (StorageBackend::Memory, CompressionKind::Zstd) => {
            Arc::new(MemoryChunkStore::new(ZstdCompression::new(config.zstd_level)))
        }
        (StorageBackend::File, CompressionKind::None) => Arc::new(
            FileChunkStore::open(&config.root, NoCompression)?.with_sync_writes(config.sync_writes),
        ),
        (StorageBackend::File, CompressionKind::Lz4) => Arc::new(
            FileChunkStore::open(&config.root, Lz4Compression)?.with_sync_writes(config.sync_writes),
        ),
        (StorageBackend::File, CompressionKind::Zstd) => Arc::new(
            FileChunkStore::open(&config.root, ZstdCompression::new(config.zstd_level))?
                .with_sync_writes(config.sync_writes),
        ),
    };
    tracing::info!(
        backend = ?config.backend,
        compression = ?config.compression,
        "opened chunk store"
    );
    Ok(store)
}
