//! # Voxel World
//!
//! Block edits with lighting kept in step. An edit locks every loaded chunk
//! within `MAX_LIGHT + 1` of the changed voxel, swaps the block, then runs
//! one propagation pass per light field over that region.
//!
//! Sunlight is only re-derived inside the edit region. Columns that extend
//! below it keep their old sunlight until a later edit reaches them.

use std::sync::Arc;

use terastream_core::{BlockId, BlockPos, BlockRegistry, LightField, Region3, MAX_LIGHT};
use terastream_lighting::{
    BatchPropagator, BlockChange, BoundedWorldView, ChunkArena, LightRules, LightingError,
    LightingResult, LockedChunks, PropagationReport, PropagationRules, SunlightRules,
};

/// Radius of the region relit after one edit.
pub const EDIT_RADIUS: i32 = MAX_LIGHT as i32 + 1;

/// Loaded chunks plus the block registry that interprets them.
pub struct VoxelWorld {
    registry: Arc<BlockRegistry>,
    arena: Arc<ChunkArena>,
}

impl VoxelWorld {
    /// Creates a world over an existing arena.
    #[must_use]
    pub fn new(registry: Arc<BlockRegistry>, arena: Arc<ChunkArena>) -> Self {
        Self { registry, arena }
    }

    /// The block registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// The chunk arena. Hand a clone to the task queue so loaded and
    /// generated chunks land here.
    #[must_use]
    pub fn arena(&self) -> &Arc<ChunkArena> {
        &self.arena
    }

    /// Places `block` at `pos` and relights both fields around it.
    ///
    /// Returns the block that was replaced. Setting the block that is
    /// already there changes nothing.
    ///
    /// # Errors
    ///
    /// `ChunkUnavailable` if the chunk holding `pos` is not loaded. A
    /// failed relight restores the old block and both light fields.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) -> LightingResult<BlockId> {
        let light = LightRules::new(Arc::clone(&self.registry));
        let sunlight = SunlightRules::new(Arc::clone(&self.registry));
        self.edit(pos, block, &light, &sunlight)
    }

    fn edit<L, S>(&self, pos: BlockPos, block: BlockId, light: &L, sunlight: &S) -> LightingResult<BlockId>
    where
        L: PropagationRules + Clone,
        S: PropagationRules + Clone,
    {
        let coord = pos.chunk();
        let region = Region3::from_center_extents(pos, EDIT_RADIUS);
        let mut locked = self.arena.lock_region(region);

        let (x, y, z) = pos.local();
        let previous = locked
            .get_mut(coord)
            .ok_or(LightingError::ChunkUnavailable { pos, chunk: coord })?
            .set_block(x, y, z, block)?;
        if previous == block {
            return Ok(previous);
        }

        let change = BlockChange::new(pos, previous, block);
        let light_report = match relight(&mut locked, light.clone(), LightField::Light, region, change) {
            Ok(report) => report,
            Err(e) => {
                restore_block(&mut locked, pos, previous);
                return Err(e);
            }
        };
        let sun_report = match relight(&mut locked, sunlight.clone(), LightField::Sunlight, region, change) {
            Ok(report) => report,
            Err(e) => {
                restore_block(&mut locked, pos, previous);
                let undo = BlockChange::new(pos, block, previous);
                if let Err(undo_err) = relight(&mut locked, light.clone(), LightField::Light, region, undo) {
                    tracing::warn!(%pos, error = %undo_err, "failed to undo light pass");
                }
                return Err(e);
            }
        };

        let report = light_report.merge(sun_report);
        tracing::debug!(%pos, from = %previous, to = %block, writes = report.writes, "block edited");
        Ok(previous)
    }

    /// Block at `pos`, or `None` if its chunk is not loaded.
    #[must_use]
    pub fn block_at(&self, pos: BlockPos) -> Option<BlockId> {
        let handle = self.arena.get(pos.chunk())?;
        let (x, y, z) = pos.local();
        let chunk = handle.lock();
        chunk.block(x, y, z).ok()
    }

    /// Block light at `pos`, or `None` if its chunk is not loaded.
    #[must_use]
    pub fn light_at(&self, pos: BlockPos) -> Option<u8> {
        self.field_at(pos, LightField::Light)
    }

    /// Sunlight at `pos`, or `None` if its chunk is not loaded.
    #[must_use]
    pub fn sunlight_at(&self, pos: BlockPos) -> Option<u8> {
        self.field_at(pos, LightField::Sunlight)
    }

    fn field_at(&self, pos: BlockPos, field: LightField) -> Option<u8> {
        let handle = self.arena.get(pos.chunk())?;
        let (x, y, z) = pos.local();
        let chunk = handle.lock();
        chunk.value(field, x, y, z).ok()
    }
}

fn relight<R: PropagationRules>(
    locked: &mut LockedChunks,
    rules: R,
    field: LightField,
    region: Region3,
    change: BlockChange,
) -> LightingResult<PropagationReport> {
    let view = BoundedWorldView::new(locked, field, region);
    BatchPropagator::new(rules, view).process(&[change])
}

fn restore_block(locked: &mut LockedChunks, pos: BlockPos, block: BlockId) {
    let (x, y, z) = pos.local();
    if let Some(chunk) = locked.get_mut(pos.chunk()) {
        if let Err(e) = chunk.set_block(x, y, z, block) {
            tracing::warn!(%pos, error = %e, "failed to restore block");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terastream_core::{BlockDefinition, Chunk, ChunkCoord, CoreError, Side};

    const STONE: BlockId = BlockId(1);
    const LAMP: BlockId = BlockId(2);

    fn world() -> VoxelWorld {
        let registry = BlockRegistry::from_definitions([
            BlockDefinition::opaque(STONE, "stone"),
            BlockDefinition::opaque(LAMP, "lamp").with_luminance(12),
        ])
        .unwrap();
        let arena = Arc::new(ChunkArena::new());
        for coord in Region3::from_center_extents(BlockPos::ORIGIN, EDIT_RADIUS * 2).chunks() {
            arena.insert(Chunk::new(coord));
        }
        VoxelWorld::new(Arc::new(registry), arena)
    }

    #[test]
    fn test_unloaded_chunk_rejected() {
        let world = world();
        let far = ChunkCoord::new(50, 0, 0).origin();
        assert!(matches!(
            world.set_block(far, STONE),
            Err(LightingError::ChunkUnavailable { .. })
        ));
        assert_eq!(world.block_at(far), None);
        assert_eq!(world.light_at(far), None);
    }

    #[test]
    fn test_opaque_emitter_lights_neighbours() {
        let world = world();
        let pos = BlockPos::new(4, 4, 4);
        assert_eq!(world.set_block(pos, LAMP).unwrap(), BlockId::AIR);
        assert_eq!(world.block_at(pos), Some(LAMP));
        assert_eq!(world.light_at(pos), Some(12));
        assert_eq!(world.light_at(pos.add(0, 1, 0)), Some(11));
        assert_eq!(world.light_at(pos.add(2, 0, 1)), Some(9));

        assert_eq!(world.set_block(pos, BlockId::AIR).unwrap(), LAMP);
        assert_eq!(world.light_at(pos), Some(0));
        assert_eq!(world.light_at(pos.add(2, 0, 1)), Some(0));
    }

    /// Sunlight rules that demand a level the field cannot hold.
    #[derive(Clone)]
    struct OverbrightSky;

    impl PropagationRules for OverbrightSky {
        fn max_value(&self) -> u8 {
            MAX_LIGHT
        }

        fn fixed_value(&self, _block: BlockId) -> u8 {
            MAX_LIGHT + 1
        }

        fn propagate_value(&self, value: u8, _side: Side, _from: BlockId) -> u8 {
            value.saturating_sub(1)
        }

        fn can_spread_out_of(&self, _block: BlockId, _side: Side) -> bool {
            true
        }

        fn can_spread_into(&self, _block: BlockId, _side: Side) -> bool {
            true
        }
    }

    #[test]
    fn test_failed_sunlight_pass_restores_block_and_light() {
        let world = world();
        let pos = BlockPos::new(4, 4, 4);
        let light = LightRules::new(Arc::clone(world.registry()));

        let err = world.edit(pos, LAMP, &light, &OverbrightSky).unwrap_err();
        assert!(matches!(err, LightingError::Core(CoreError::ValueTooWide { .. })));

        assert_eq!(world.block_at(pos), Some(BlockId::AIR));
        for spot in [pos, pos.add(0, 1, 0), pos.add(2, 0, 1), pos.add(-5, 3, 0)] {
            assert_eq!(world.light_at(spot), Some(0), "light left at {spot}");
            assert_eq!(world.sunlight_at(spot), Some(0), "sunlight left at {spot}");
        }

        // The world still accepts the same edit with the real rules
        world.set_block(pos, LAMP).unwrap();
        assert_eq!(world.light_at(pos.add(0, 1, 0)), Some(11));
    }

    #[test]
    fn test_same_block_is_noop() {
        let world = world();
        assert_eq!(world.set_block(BlockPos::ORIGIN, BlockId::AIR).unwrap(), BlockId::AIR);
        assert_eq!(world.light_at(BlockPos::ORIGIN), Some(0));
    }
}
