//! Integration tests for light propagation over a chunk arena.
//!
//! - Open-region convergence to `max(0, 15 - d)`
//! - Occlusion in a one-voxel corridor
//! - Idempotence of a repeated increase pass
//! - Convergence invariant after a mixed batch of edits

use std::sync::Arc;

use terastream_core::{
    BlockDefinition, BlockId, BlockPos, BlockRegistry, Chunk, LightField, Region3, Side,
};
use terastream_lighting::{
    BatchPropagator, BlockChange, BoundedWorldView, ChunkArena, LightRules, PropagationRules,
    PropagatorWorldView,
};

const STONE: BlockId = BlockId(1);
const TORCH: BlockId = BlockId(2);

fn registry() -> Arc<BlockRegistry> {
    Arc::new(
        BlockRegistry::from_definitions([
            BlockDefinition::opaque(STONE, "stone"),
            BlockDefinition::translucent(TORCH, "torch").with_luminance(15),
        ])
        .unwrap(),
    )
}

struct World {
    arena: ChunkArena,
    region: Region3,
    registry: Arc<BlockRegistry>,
}

impl World {
    fn open(extent: i32) -> Self {
        let region = Region3::from_center_extents(BlockPos::ORIGIN, extent);
        let arena = ChunkArena::new();
        for coord in region.chunks() {
            arena.insert(Chunk::new(coord));
        }
        Self {
            arena,
            region,
            registry: registry(),
        }
    }

    /// Fills the region with stone except a corridor along X through the origin.
    fn corridor(extent: i32) -> Self {
        let world = Self::open(extent);
        for pos in world.region.positions() {
            if pos.y != 0 || pos.z != 0 {
                world.set_raw(pos, STONE);
            }
        }
        world
    }

    fn set_raw(&self, pos: BlockPos, block: BlockId) -> BlockId {
        let handle = self.arena.get(pos.chunk()).unwrap();
        let (x, y, z) = pos.local();
        let mut chunk = handle.lock();
        chunk.set_block(x, y, z, block).unwrap()
    }

    fn edit(&self, pos: BlockPos, block: BlockId) {
        let from = self.set_raw(pos, block);
        let mut locked = self.arena.lock_region(self.region);
        let view = BoundedWorldView::new(&mut locked, LightField::Light, self.region);
        let mut propagator = BatchPropagator::new(LightRules::new(Arc::clone(&self.registry)), view);
        propagator.process(&[BlockChange::new(pos, from, block)]).unwrap();
    }

    fn snapshot(&self) -> Vec<u8> {
        let mut locked = self.arena.lock_region(self.region);
        let view = BoundedWorldView::new(&mut locked, LightField::Light, self.region);
        self.region.positions().map(|p| view.get_value(p)).collect()
    }

    fn light(&self, pos: BlockPos) -> u8 {
        let region = Region3::single(pos);
        let mut locked = self.arena.lock_region(region);
        let view = BoundedWorldView::new(&mut locked, LightField::Light, region);
        view.get_value(pos)
    }
}

#[test]
fn test_open_region_convergence() {
    let world = World::open(32);
    world.edit(BlockPos::ORIGIN, TORCH);

    assert_eq!(world.light(BlockPos::new(3, 0, 0)), 12);
    assert_eq!(world.light(BlockPos::new(16, 0, 0)), 0);

    let sample = Region3::from_center_extents(BlockPos::ORIGIN, 17);
    for pos in sample.positions() {
        let d = pos.manhattan(BlockPos::ORIGIN);
        let expected = 15u32.saturating_sub(d) as u8;
        assert_eq!(world.light(pos), expected, "wrong light at {pos} (d = {d})");
    }
}

#[test]
fn test_occluder_in_corridor() {
    let world = World::corridor(20);
    world.edit(BlockPos::ORIGIN, TORCH);
    assert_eq!(world.light(BlockPos::new(3, 0, 0)), 12);
    assert_eq!(world.light(BlockPos::new(1, 0, 0)), 14);

    world.edit(BlockPos::new(2, 0, 0), STONE);
    assert_eq!(world.light(BlockPos::new(2, 0, 0)), 0);
    assert_eq!(world.light(BlockPos::new(3, 0, 0)), 0);
    assert_eq!(world.light(BlockPos::new(10, 0, 0)), 0);
    assert_eq!(world.light(BlockPos::new(1, 0, 0)), 14);
    assert_eq!(world.light(BlockPos::new(-3, 0, 0)), 12);

    // Opening the corridor again restores the far side
    world.edit(BlockPos::new(2, 0, 0), BlockId::AIR);
    assert_eq!(world.light(BlockPos::new(3, 0, 0)), 12);
}

#[test]
fn test_opaque_block_in_open_air_is_routed_around() {
    let world = World::open(24);
    world.edit(BlockPos::ORIGIN, TORCH);
    world.edit(BlockPos::new(2, 0, 0), STONE);

    assert_eq!(world.light(BlockPos::new(2, 0, 0)), 0);
    assert_eq!(world.light(BlockPos::new(1, 0, 0)), 14);
    // Shortest path around the block is 5 steps instead of 3
    assert_eq!(world.light(BlockPos::new(3, 0, 0)), 10);
}

#[test]
fn test_increase_is_idempotent() {
    let world = World::open(20);
    world.edit(BlockPos::ORIGIN, TORCH);
    world.edit(BlockPos::new(4, 1, 0), STONE);
    let first = world.snapshot();

    let mut locked = world.arena.lock_region(world.region);
    let view = BoundedWorldView::new(&mut locked, LightField::Light, world.region);
    let mut propagator = BatchPropagator::new(LightRules::new(Arc::clone(&world.registry)), view);
    let report = propagator.propagate_increase(&[(BlockPos::ORIGIN, 15)]).unwrap();
    drop(propagator);
    drop(locked);

    assert_eq!(report.writes, 0);
    assert_eq!(world.snapshot(), first);
}

#[test]
fn test_decrease_seed_clears_unsupported_light() {
    let world = World::open(20);
    world.edit(BlockPos::ORIGIN, TORCH);

    // Caller swaps the block itself, then reports the old value
    world.set_raw(BlockPos::ORIGIN, BlockId::AIR);
    let mut locked = world.arena.lock_region(world.region);
    let view = BoundedWorldView::new(&mut locked, LightField::Light, world.region);
    let mut propagator = BatchPropagator::new(LightRules::new(Arc::clone(&world.registry)), view);
    let report = propagator.propagate_decrease(&[(BlockPos::ORIGIN, 15)]).unwrap();
    assert!(report.affected.unwrap().contains(BlockPos::new(0, 0, 14)));
    drop(propagator);
    drop(locked);

    assert!(world.snapshot().iter().all(|v| *v == 0));
}

#[test]
fn test_convergence_invariant_after_mixed_edits() {
    let world = World::open(24);
    let edits = [
        (BlockPos::ORIGIN, TORCH),
        (BlockPos::new(6, 0, 0), TORCH),
        (BlockPos::new(3, 0, 0), STONE),
        (BlockPos::new(3, 1, 0), STONE),
        (BlockPos::new(3, -1, 0), STONE),
        (BlockPos::new(6, 0, 0), BlockId::AIR),
        (BlockPos::new(-5, 2, 1), TORCH),
        (BlockPos::new(3, 0, 0), BlockId::AIR),
    ];
    for (pos, block) in edits {
        world.edit(pos, block);
    }

    let rules = LightRules::new(Arc::clone(&world.registry));
    let mut locked = world.arena.lock_region(world.region);
    let view = BoundedWorldView::new(&mut locked, LightField::Light, world.region);
    let inner = Region3::from_center_extents(BlockPos::ORIGIN, 20);
    for pos in inner.positions() {
        let block = view.get_block(pos).unwrap();
        if !rules.can_spread_into(block, Side::Top) {
            continue;
        }
        let value = view.get_value(pos);
        assert!(value >= rules.fixed_value(block));
        for side in Side::ALL {
            let adj = pos.adjacent(side);
            let adj_block = view.get_block(adj).unwrap();
            if !rules.can_spread_out_of(adj_block, side.reverse()) {
                continue;
            }
            let offered = rules.propagate_value(view.get_value(adj), side.reverse(), adj_block);
            assert!(value >= offered, "{pos} holds {value} but {adj} offers {offered}");
        }
    }
}
