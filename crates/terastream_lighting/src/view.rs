//! # Propagator World View
//!
//! The narrow interface propagation works through. It is clipped to a
//! declared region, with deliberately asymmetric failure behaviour:
//!
//! | operation   | outside region / absent chunk            |
//! |-------------|------------------------------------------|
//! | `get_value` | `UNAVAILABLE` sentinel                   |
//! | `set_value` | `OutsideRegion` / `ChunkUnavailable`     |
//! | `get_block` | `OutsideRegion` / `ChunkUnavailable`     |
//!
//! Reads past the edge are routine during a flood fill. Writes past it mean
//! the region was sized wrong.

use terastream_core::{BlockId, BlockPos, LightField, Region3};

use crate::arena::LockedChunks;
use crate::error::{LightingError, LightingResult};

/// Value returned for reads outside the region. Never a valid light level.
pub const UNAVAILABLE: u8 = 0xFF;

/// Region-clipped access to one scalar field plus block ids.
pub trait PropagatorWorldView {
    /// The declared region.
    fn region(&self) -> Region3;

    /// Field value at `pos`, or [`UNAVAILABLE`].
    fn get_value(&self, pos: BlockPos) -> u8;

    /// Writes the field value at `pos`.
    ///
    /// # Errors
    ///
    /// `OutsideRegion` or `ChunkUnavailable`.
    fn set_value(&mut self, pos: BlockPos, value: u8) -> LightingResult<()>;

    /// Block at `pos`.
    ///
    /// # Errors
    ///
    /// `OutsideRegion` or `ChunkUnavailable`.
    fn get_block(&self, pos: BlockPos) -> LightingResult<BlockId>;
}

/// [`PropagatorWorldView`] over a set of locked arena chunks.
pub struct BoundedWorldView<'a> {
    chunks: &'a mut LockedChunks,
    field: LightField,
    region: Region3,
}

impl<'a> BoundedWorldView<'a> {
    /// Creates a view of `field` clipped to `region`.
    pub fn new(chunks: &'a mut LockedChunks, field: LightField, region: Region3) -> Self {
        Self {
            chunks,
            field,
            region,
        }
    }

    /// The field this view exposes.
    #[must_use]
    pub const fn field(&self) -> LightField {
        self.field
    }

    fn check_region(&self, pos: BlockPos) -> LightingResult<()> {
        if self.region.contains(pos) {
            Ok(())
        } else {
            Err(LightingError::OutsideRegion {
                pos,
                region: self.region,
            })
        }
    }
}

impl PropagatorWorldView for BoundedWorldView<'_> {
    fn region(&self) -> Region3 {
        self.region
    }

    fn get_value(&self, pos: BlockPos) -> u8 {
        if !self.region.contains(pos) {
            return UNAVAILABLE;
        }
        let Some(chunk) = self.chunks.get(pos.chunk()) else {
            return UNAVAILABLE;
        };
        let (x, y, z) = pos.local();
        chunk.value(self.field, x, y, z).unwrap_or(UNAVAILABLE)
    }

    fn set_value(&mut self, pos: BlockPos, value: u8) -> LightingResult<()> {
        self.check_region(pos)?;
        let coord = pos.chunk();
        let chunk = self
            .chunks
            .get_mut(coord)
            .ok_or(LightingError::ChunkUnavailable { pos, chunk: coord })?;
        let (x, y, z) = pos.local();
        chunk.set_value(self.field, x, y, z, value)?;
        Ok(())
    }

    fn get_block(&self, pos: BlockPos) -> LightingResult<BlockId> {
        self.check_region(pos)?;
        let coord = pos.chunk();
        let chunk = self
            .chunks
            .get(coord)
            .ok_or(LightingError::ChunkUnavailable { pos, chunk: coord })?;
        let (x, y, z) = pos.local();
        Ok(chunk.block(x, y, z)?)
    }
}
