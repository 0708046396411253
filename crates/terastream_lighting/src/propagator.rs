//! # Batch Propagator
//!
//! Bucketed breadth-first flood fill that keeps one scalar field consistent
//! with its sources and occluders after a batch of block changes.
//!
//! ## Algorithm
//!
//! Values are bucketed by strength, strongest first (index 0 holds
//! `max_value`). A pass runs two phases, both 6-connected:
//!
//! 1. **Reduction**: every queued voxel is purged back to its fixed value.
//!    Neighbours holding exactly the value it would have given them are
//!    queued for purging too. Neighbours holding anything else still have a
//!    valid source and are queued to spread again.
//! 2. **Increase**: every queued voxel pushes `propagate_value(v)` into each
//!    neighbour whose stored value is strictly lower.
//!
//! Processing strongest-first means each voxel settles the first time it is
//! raised, so the pass touches only the voxels whose value changes.
//!
//! ## Rollback
//!
//! Every write is journaled. If any view call fails mid-pass the journal is
//! replayed in reverse and the error is returned, so no partially converged
//! field is ever left behind.

use std::collections::HashSet;

use terastream_core::{BlockId, BlockPos, Region3, Side};

use crate::error::LightingResult;
use crate::rules::PropagationRules;
use crate::view::{PropagatorWorldView, UNAVAILABLE};

/// A block that changed type. The view must already hold `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockChange {
    /// Where the change happened.
    pub pos: BlockPos,
    /// Block before the change.
    pub from: BlockId,
    /// Block after the change.
    pub to: BlockId,
}

impl BlockChange {
    /// Creates a change record.
    #[must_use]
    pub const fn new(pos: BlockPos, from: BlockId, to: BlockId) -> Self {
        Self { pos, from, to }
    }
}

/// Summary of one converged pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Number of field writes.
    pub writes: usize,
    /// Smallest region containing every written voxel.
    pub affected: Option<Region3>,
}

impl PropagationReport {
    /// Combines two reports.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let affected = match (self.affected, other.affected) {
            (Some(a), Some(b)) => Some(a.encompassing(b)),
            (a, b) => a.or(b),
        };
        Self {
            writes: self.writes + other.writes,
            affected,
        }
    }
}

/// Flood-fill propagator for one field over one world view.
pub struct BatchPropagator<R, V> {
    rules: R,
    view: V,
    max: u8,
    /// Voxels to purge, bucketed by the value they used to hold.
    reduce_queues: Vec<HashSet<BlockPos>>,
    /// Voxels to spread from, bucketed by the value they hold.
    increase_queues: Vec<HashSet<BlockPos>>,
    /// `(pos, previous value)` for every write of the current pass.
    journal: Vec<(BlockPos, u8)>,
    affected: Option<Region3>,
}

impl<R: PropagationRules, V: PropagatorWorldView> BatchPropagator<R, V> {
    /// Creates a propagator.
    pub fn new(rules: R, view: V) -> Self {
        let max = rules.max_value();
        let levels = usize::from(max);
        Self {
            rules,
            view,
            max,
            reduce_queues: vec![HashSet::new(); levels],
            increase_queues: vec![HashSet::new(); levels],
            journal: Vec::new(),
            affected: None,
        }
    }

    /// The underlying view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Consumes the propagator, returning the view.
    pub fn into_view(self) -> V {
        self.view
    }

    /// Reviews every change, then runs reduction and increase to convergence.
    ///
    /// # Errors
    ///
    /// Any view error. All writes of the pass are undone first.
    pub fn process(&mut self, changes: &[BlockChange]) -> LightingResult<PropagationReport> {
        self.run(|p| {
            for change in changes {
                p.review_change(*change)?;
            }
            p.process_reduction()?;
            p.process_increase()
        })
    }

    /// Increase phase seeded from voxels whose value just rose.
    ///
    /// A seed above the stored value is written first. A seed at or below it
    /// spreads the stored value instead.
    ///
    /// # Errors
    ///
    /// Any view error, including a seed outside the region. All writes of
    /// the pass are undone first.
    pub fn propagate_increase(&mut self, seeds: &[(BlockPos, u8)]) -> LightingResult<PropagationReport> {
        self.run(|p| {
            for &(pos, value) in seeds {
                let current = p.view.get_value(pos);
                if current == UNAVAILABLE || current < value {
                    p.increase(pos, value)?;
                } else {
                    p.queue_spread(pos, current);
                }
            }
            p.process_increase()
        })
    }

    /// Regression phase seeded from voxels whose value just fell from the
    /// given old value, followed by the increase phase that re-lights the
    /// cleared area from surviving sources.
    ///
    /// # Errors
    ///
    /// Any view error. All writes of the pass are undone first.
    pub fn propagate_decrease(&mut self, seeds: &[(BlockPos, u8)]) -> LightingResult<PropagationReport> {
        self.run(|p| {
            for &(pos, old) in seeds {
                p.view.get_block(pos)?;
                p.reduce(pos, old);
            }
            p.process_reduction()?;
            p.process_increase()
        })
    }

    fn run<F>(&mut self, pass: F) -> LightingResult<PropagationReport>
    where
        F: FnOnce(&mut Self) -> LightingResult<()>,
    {
        self.journal.clear();
        self.affected = None;
        let result = pass(self);
        self.clear_queues();

        match result {
            Ok(()) => {
                let report = PropagationReport {
                    writes: self.journal.len(),
                    affected: self.affected.take(),
                };
                self.journal.clear();
                tracing::debug!(writes = report.writes, "propagation converged");
                Ok(report)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn rollback(&mut self) {
        let writes = self.journal.len();
        while let Some((pos, previous)) = self.journal.pop() {
            if let Err(e) = self.view.set_value(pos, previous) {
                tracing::warn!(%pos, error = %e, "failed to restore value during rollback");
            }
        }
        self.affected = None;
        tracing::warn!(writes, "propagation rolled back");
    }

    fn clear_queues(&mut self) {
        for queue in self.reduce_queues.iter_mut().chain(self.increase_queues.iter_mut()) {
            queue.clear();
        }
    }

    #[inline]
    fn level(&self, value: u8) -> usize {
        usize::from(self.max - value)
    }

    fn write(&mut self, pos: BlockPos, value: u8) -> LightingResult<()> {
        let previous = self.view.get_value(pos);
        self.view.set_value(pos, value)?;
        self.journal.push((pos, previous));
        self.affected = Some(match self.affected {
            Some(region) => region.expand_to_contain(pos),
            None => Region3::single(pos),
        });
        Ok(())
    }

    fn review_change(&mut self, change: BlockChange) -> LightingResult<()> {
        let pos = change.pos;
        // Fails fast for a change outside the region
        self.view.get_block(pos)?;

        let new_value = self.rules.fixed_value(change.to);
        let existing = self.view.get_value(pos);
        if new_value > existing {
            self.increase(pos, new_value)?;
        }

        let old_value = self.rules.fixed_value(change.from);
        if new_value < old_value {
            self.reduce(pos, old_value);
        }

        for side in Side::ALL {
            let comparison = self.rules.compare_propagation(change.to, change.from, side);
            let adj = pos.adjacent(side);

            if comparison.is_restricting() && existing > 0 {
                self.reduce(pos, existing);
                let adj_value = self.view.get_value(adj);
                if adj_value == self.rules.propagate_value(existing, side, change.from) {
                    self.reduce(adj, adj_value);
                }
            } else if comparison.is_permitting() {
                if existing > 0 {
                    self.queue_spread(pos, existing);
                }
                let adj_value = self.view.get_value(adj);
                if adj_value != UNAVAILABLE {
                    self.queue_spread(adj, adj_value);
                }
            }
        }
        Ok(())
    }

    /// Resets `pos` to its fixed value and queues dependent neighbours.
    fn purge(&mut self, pos: BlockPos, old: u8) -> LightingResult<()> {
        let level = self.level(old);
        self.increase_queues[level].remove(&pos);

        let block = self.view.get_block(pos)?;
        let fixed = self.rules.fixed_value(block);
        if fixed > 0 {
            self.increase(pos, fixed)?;
        } else {
            self.write(pos, 0)?;
        }

        for side in Side::ALL {
            if !self.rules.can_spread_out_of(block, side) {
                continue;
            }
            let expected = self.rules.propagate_value(old, side, block);
            let adj = pos.adjacent(side);
            let adj_value = self.view.get_value(adj);
            if adj_value == UNAVAILABLE {
                continue;
            }

            if expected > 0 && adj_value == expected {
                let adj_block = self.view.get_block(adj)?;
                if self.rules.can_spread_into(adj_block, side.reverse()) {
                    self.reduce(adj, expected);
                }
            } else if adj_value > 0 {
                self.queue_spread(adj, adj_value);
            }
        }
        Ok(())
    }

    /// Spreads `value` from `pos` into every lower neighbour.
    fn push(&mut self, pos: BlockPos, value: u8) -> LightingResult<()> {
        let block = self.view.get_block(pos)?;
        for side in Side::ALL {
            if !self.rules.can_spread_out_of(block, side) {
                continue;
            }
            let propagated = self.rules.propagate_value(value, side, block);
            let adj = pos.adjacent(side);
            let adj_value = self.view.get_value(adj);

            if adj_value != UNAVAILABLE && adj_value < propagated {
                let adj_block = self.view.get_block(adj)?;
                if self.rules.can_spread_into(adj_block, side.reverse()) {
                    self.increase(adj, propagated)?;
                }
            }
        }
        Ok(())
    }

    fn process_reduction(&mut self) -> LightingResult<()> {
        for depth in 0..self.reduce_queues.len() {
            let old = self.max - depth as u8;
            while !self.reduce_queues[depth].is_empty() {
                let batch = std::mem::take(&mut self.reduce_queues[depth]);
                for pos in batch {
                    self.purge(pos, old)?;
                }
            }
        }
        Ok(())
    }

    fn process_increase(&mut self) -> LightingResult<()> {
        // Level 1 spreads nothing
        for depth in 0..self.increase_queues.len().saturating_sub(1) {
            let value = self.max - depth as u8;
            while !self.increase_queues[depth].is_empty() {
                let batch = std::mem::take(&mut self.increase_queues[depth]);
                for pos in batch {
                    self.push(pos, value)?;
                }
            }
        }
        Ok(())
    }

    fn increase(&mut self, pos: BlockPos, value: u8) -> LightingResult<()> {
        self.write(pos, value)?;
        self.queue_spread(pos, value);
        Ok(())
    }

    fn reduce(&mut self, pos: BlockPos, old: u8) {
        if old > 0 && old <= self.max {
            let level = self.level(old);
            self.reduce_queues[level].insert(pos);
        }
    }

    fn queue_spread(&mut self, pos: BlockPos, value: u8) {
        if value > 1 && value <= self.max {
            let level = self.level(value);
            self.increase_queues[level].insert(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ChunkArena;
    use crate::error::LightingError;
    use crate::rules::{LightRules, SunlightRules};
    use crate::view::BoundedWorldView;
    use std::sync::Arc;
    use terastream_core::{BlockDefinition, BlockRegistry, Chunk, LightField};

    const STONE: BlockId = BlockId(1);
    const TORCH: BlockId = BlockId(2);
    const CANDLE: BlockId = BlockId(3);

    fn registry() -> Arc<BlockRegistry> {
        Arc::new(
            BlockRegistry::from_definitions([
                BlockDefinition::opaque(STONE, "stone"),
                BlockDefinition::translucent(TORCH, "torch").with_luminance(15),
                BlockDefinition::translucent(CANDLE, "candle").with_luminance(2),
            ])
            .unwrap(),
        )
    }

    fn arena_for(region: Region3) -> ChunkArena {
        let arena = ChunkArena::new();
        for coord in region.chunks() {
            arena.insert(Chunk::new(coord));
        }
        arena
    }

    fn set_block(arena: &ChunkArena, pos: BlockPos, block: BlockId) -> BlockId {
        let handle = arena.get(pos.chunk()).unwrap();
        let (x, y, z) = pos.local();
        let previous = handle.lock().set_block(x, y, z, block).unwrap();
        previous
    }

    fn light(arena: &ChunkArena, pos: BlockPos) -> u8 {
        let handle = arena.get(pos.chunk()).unwrap();
        let (x, y, z) = pos.local();
        let value = handle.lock().light(x, y, z).unwrap();
        value
    }

    fn change(arena: &ChunkArena, region: Region3, pos: BlockPos, to: BlockId) -> PropagationReport {
        let from = set_block(arena, pos, to);
        let mut locked = arena.lock_region(region);
        let view = BoundedWorldView::new(&mut locked, LightField::Light, region);
        let mut propagator = BatchPropagator::new(LightRules::new(registry()), view);
        propagator.process(&[BlockChange::new(pos, from, to)]).unwrap()
    }

    #[test]
    fn test_place_and_remove_light() {
        let region = Region3::from_center_extents(BlockPos::ORIGIN, 20);
        let arena = arena_for(region);

        let report = change(&arena, region, BlockPos::ORIGIN, TORCH);
        assert!(report.writes > 0);
        assert_eq!(light(&arena, BlockPos::ORIGIN), 15);
        assert_eq!(light(&arena, BlockPos::new(0, 14, 0)), 1);
        assert_eq!(light(&arena, BlockPos::new(2, -3, 4)), 6);

        change(&arena, region, BlockPos::ORIGIN, BlockId::AIR);
        for pos in Region3::from_center_extents(BlockPos::ORIGIN, 16).positions() {
            assert_eq!(light(&arena, pos), 0, "stale light at {pos}");
        }
    }

    #[test]
    fn test_dim_light_replaces_bright() {
        let region = Region3::from_center_extents(BlockPos::ORIGIN, 20);
        let arena = arena_for(region);
        change(&arena, region, BlockPos::ORIGIN, TORCH);
        change(&arena, region, BlockPos::ORIGIN, CANDLE);

        assert_eq!(light(&arena, BlockPos::ORIGIN), 2);
        assert_eq!(light(&arena, BlockPos::new(1, 0, 0)), 1);
        assert_eq!(light(&arena, BlockPos::new(0, 0, 2)), 0);
        assert_eq!(light(&arena, BlockPos::new(5, 0, 0)), 0);
    }

    #[test]
    fn test_overlapping_lights() {
        let region = Region3::from_center_extents(BlockPos::ORIGIN, 24);
        let arena = arena_for(region);
        let second = BlockPos::new(5, 0, 0);
        change(&arena, region, BlockPos::ORIGIN, TORCH);
        change(&arena, region, second, TORCH);

        let expected = [15, 14, 13, 13, 14, 15];
        for (x, value) in expected.iter().enumerate() {
            assert_eq!(light(&arena, BlockPos::new(x as i32, 0, 0)), *value);
        }

        change(&arena, region, second, BlockId::AIR);
        for x in 0..16 {
            assert_eq!(light(&arena, BlockPos::new(x, 0, 0)), 15u8.saturating_sub(x as u8));
        }
    }

    #[test]
    fn test_rollback_on_out_of_region_seed() {
        let region = Region3::from_center_extents(BlockPos::ORIGIN, 4);
        let arena = arena_for(region);
        let mut locked = arena.lock_region(region);
        let view = BoundedWorldView::new(&mut locked, LightField::Light, region);
        let mut propagator = BatchPropagator::new(LightRules::new(registry()), view);

        let err = propagator
            .propagate_increase(&[(BlockPos::ORIGIN, 10), (BlockPos::new(9, 0, 0), 10)])
            .unwrap_err();
        assert!(matches!(err, LightingError::OutsideRegion { .. }));
        for pos in region.positions() {
            assert_eq!(propagator.view().get_value(pos), 0, "write survived rollback at {pos}");
        }
    }

    #[test]
    fn test_sunlight_column_shadow() {
        let region = Region3::from_corners(BlockPos::new(-8, 0, -8), BlockPos::new(8, 20, 8));
        let arena = arena_for(region);
        {
            let mut locked = arena.lock_region(region);
            for coord in locked.coords().collect::<Vec<_>>() {
                locked
                    .get_mut(coord)
                    .unwrap()
                    .fill_value(LightField::Sunlight, 15)
                    .unwrap();
            }
        }

        let roof = BlockPos::new(0, 10, 0);
        let from = set_block(&arena, roof, STONE);
        let mut locked = arena.lock_region(region);
        let view = BoundedWorldView::new(&mut locked, LightField::Sunlight, region);
        let mut propagator = BatchPropagator::new(SunlightRules::new(registry()), view);
        propagator.process(&[BlockChange::new(roof, from, STONE)]).unwrap();

        let view = propagator.view();
        assert_eq!(view.get_value(roof), 0);
        assert_eq!(view.get_value(BlockPos::new(0, 11, 0)), 15);
        // Shadowed column is lit sideways by its open neighbours
        assert_eq!(view.get_value(BlockPos::new(0, 9, 0)), 14);
        assert_eq!(view.get_value(BlockPos::new(0, 0, 0)), 14);
        assert_eq!(view.get_value(BlockPos::new(1, 5, 0)), 15);
    }
}
