//! # TERASTREAM
//!
//! Chunked voxel world streaming: packed per-voxel storage, pluggable chunk
//! persistence, bounded light propagation and background chunk workers.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐   submit    ┌──────────────────┐  put/get  ┌──────────────┐
//!   │  VoxelWorld  │────────────>│  ChunkTaskQueue  │──────────>│  ChunkStore  │
//!   │  set_block   │             │  chunk-worker-N  │           │  memory/file │
//!   └──────┬───────┘             └────────┬─────────┘           └──────────────┘
//!          │ lock_region                  │ insert
//!          v                              v
//!   ┌─────────────────────────────────────────────┐
//!   │  ChunkArena: Arc<Mutex<Chunk>> per position │
//!   │  Chunk: blocks / light / sunlight / liquid  │
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: `WorldConfig` loaded from TOML
//! - `world`: `VoxelWorld`, block edits with relighting

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod world;

pub use terastream_core as core;
pub use terastream_lighting as lighting;
pub use terastream_storage as storage;
pub use terastream_tasks as tasks;

pub use config::{ConfigError, ConfigResult, WorldConfig};
pub use storage::{open_store, ChunkStore, StorageConfig, StoreError, StoreResult};
pub use tasks::{ChunkTaskQueue, FlatGenerator, TaskKind, TaskOutcome, TaskQueueConfig};
pub use world::{VoxelWorld, EDIT_RADIUS};
