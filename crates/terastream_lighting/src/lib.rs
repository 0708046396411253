//! # TERASTREAM Lighting
//!
//! Keeps the light and sunlight fields consistent after block edits without
//! rescanning the world.
//!
//! ## Design Principles
//!
//! 1. **Bounded**: propagation only touches a declared region
//! 2. **Converged or untouched**: a failed pass is rolled back completely
//! 3. **Deadlock-free**: chunks are always locked in ascending coordinate order
//! 4. **Decoupled**: the algorithm only sees a [`PropagatorWorldView`]
//!
//! ## Core Components
//!
//! - `ChunkArena`: loaded chunks, one mutex each
//! - `BoundedWorldView`: region-clipped view over locked chunks
//! - `LightRules` / `SunlightRules`: per-field propagation rules
//! - `BatchPropagator`: bucketed reduce/increase flood fill
//!
//! ## Example
//!
//! ```rust,ignore
//! let region = Region3::from_center_extents(pos, i32::from(MAX_LIGHT) + 1);
//! let mut locked = arena.lock_region(region);
//! let view = BoundedWorldView::new(&mut locked, LightField::Light, region);
//! let mut propagator = BatchPropagator::new(LightRules::new(registry), view);
//! propagator.process(&[BlockChange::new(pos, old_block, new_block)])?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod arena;
pub mod error;
pub mod propagator;
pub mod rules;
pub mod view;

pub use arena::{ChunkArena, ChunkGuard, ChunkHandle, LockedChunks};
pub use error::{LightingError, LightingResult};
pub use propagator::{BatchPropagator, BlockChange, PropagationReport};
pub use rules::{LightRules, PropagationComparison, PropagationRules, SunlightRules};
pub use view::{BoundedWorldView, PropagatorWorldView, UNAVAILABLE};
