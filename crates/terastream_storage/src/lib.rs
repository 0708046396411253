//! # TERASTREAM Storage
//!
//! Chunk persistence and caching behind one trait, [`ChunkStore`].
//!
//! ## Design Principles
//!
//! 1. **No silent loss**: disk errors surface as `Disk`, never as "not found"
//! 2. **Self-describing bytes**: every entry starts with its compression id
//! 3. **Atomic files**: write-then-rename, a crash never leaves a torn chunk
//! 4. **Thread-safe**: stores are shared across workers behind an `Arc`
//!
//! ## Backends
//!
//! | backend                   | memory  | CPU     | survives restart |
//! |---------------------------|---------|---------|------------------|
//! | `UncompressedMemoryStore` | highest | lowest  | no               |
//! | `Lz4MemoryStore`          | low     | low     | no               |
//! | `ZstdMemoryStore`         | lowest  | medium  | no               |
//! | `FileChunkStore<C>`       | index   | C + I/O | yes              |
//!
//! ## Example
//!
//! ```rust,ignore
//! use terastream_storage::{ChunkStore, FileChunkStore, ZstdCompression};
//!
//! let store = FileChunkStore::open("saves/chunks", ZstdCompression::default())?;
//! store.put(&chunk)?;
//! let again = store.get(chunk.coord())?.expect("just stored");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod compression;
pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use compression::{
    seal, unseal, Compression, CompressionKind, Lz4Compression, NoCompression, ZstdCompression,
    DEFAULT_ZSTD_LEVEL,
};
pub use config::{open_store, StorageBackend, StorageConfig};
pub use error::{StoreError, StoreResult};
pub use file::{chunk_file_name, parse_chunk_file_name, FileChunkStore};
pub use memory::{Lz4MemoryStore, MemoryChunkStore, UncompressedMemoryStore, ZstdMemoryStore};
pub use store::ChunkStore;
