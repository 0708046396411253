//! # TERASTREAM Tasks
//!
//! Background chunk work: generation, loading and storing run on a pool of
//! named worker threads and report back over a completion channel.
//!
//! ## Design Principles
//!
//! 1. **Off-thread I/O**: the simulation thread only submits and polls
//! 2. **Per-position order**: one position always maps to one worker
//! 3. **Graceful stop**: shutdown drains queued tasks before joining
//!
//! ## Example
//!
//! ```rust,ignore
//! let queue = ChunkTaskQueue::new(config, store, Arc::new(generator), arena)?;
//! queue.submit(coord, TaskKind::Load)?;
//! for done in queue.completions().try_iter() {
//!     if done.outcome == TaskOutcome::NotFound {
//!         queue.submit(done.coord, TaskKind::Generate)?;
//!     }
//! }
//! queue.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod generator;
pub mod queue;

pub use config::TaskQueueConfig;
pub use error::{TaskError, TaskResult};
pub use generator::{ChunkGenerator, FlatGenerator};
pub use queue::{ChunkTaskQueue, TaskCompletion, TaskKind, TaskOutcome};
