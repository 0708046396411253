//! # Propagation Rules
//!
//! A ruleset tells the propagator how one scalar field behaves:
//! what a block emits, how a value decays per step, and which block faces
//! let it through.
//!
//! Two rulesets ship here:
//!
//! - [`LightRules`]: emitters seed their luminance, every step costs 1,
//!   opaque blocks absorb everything.
//! - [`SunlightRules`]: nothing emits, full-strength light travelling
//!   straight down does not decay, everything else costs 1.

use std::sync::Arc;

use terastream_core::{BlockId, BlockRegistry, Side, MAX_LIGHT};

/// How a block change alters propagation across one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagationComparison {
    /// No difference.
    Identical,
    /// The new block lets more through.
    MorePermissive,
    /// The new block lets less through.
    MoreRestricted,
}

impl PropagationComparison {
    /// Returns true if the change may lower neighbouring values.
    #[must_use]
    pub const fn is_restricting(self) -> bool {
        matches!(self, Self::MoreRestricted)
    }

    /// Returns true if the change may raise neighbouring values.
    #[must_use]
    pub const fn is_permitting(self) -> bool {
        matches!(self, Self::MorePermissive)
    }
}

/// Behaviour of one propagated field.
pub trait PropagationRules {
    /// Strongest value the field can hold.
    fn max_value(&self) -> u8;

    /// Value a block holds regardless of its neighbours.
    fn fixed_value(&self, block: BlockId) -> u8;

    /// Value arriving at the neighbour on `side` of a voxel holding `value`
    /// and containing `from`.
    fn propagate_value(&self, value: u8, side: Side, from: BlockId) -> u8;

    /// Whether the field can leave `block` through `side`.
    fn can_spread_out_of(&self, block: BlockId, side: Side) -> bool;

    /// Whether the field can enter `block` through `side`.
    fn can_spread_into(&self, block: BlockId, side: Side) -> bool;

    /// Compares how `new_block` and `old_block` let the field cross `side`.
    fn compare_propagation(
        &self,
        new_block: BlockId,
        old_block: BlockId,
        side: Side,
    ) -> PropagationComparison {
        let new = (
            self.can_spread_out_of(new_block, side),
            self.can_spread_into(new_block, side),
        );
        let old = (
            self.can_spread_out_of(old_block, side),
            self.can_spread_into(old_block, side),
        );
        if new == old {
            PropagationComparison::Identical
        } else if new.0 >= old.0 && new.1 >= old.1 {
            PropagationComparison::MorePermissive
        } else {
            PropagationComparison::MoreRestricted
        }
    }
}

/// Block light from emitters.
#[derive(Clone, Debug)]
pub struct LightRules {
    registry: Arc<BlockRegistry>,
}

impl LightRules {
    /// Creates rules backed by `registry`.
    #[must_use]
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }
}

impl PropagationRules for LightRules {
    fn max_value(&self) -> u8 {
        MAX_LIGHT
    }

    fn fixed_value(&self, block: BlockId) -> u8 {
        self.registry.luminance(block)
    }

    fn propagate_value(&self, value: u8, _side: Side, _from: BlockId) -> u8 {
        value.saturating_sub(1)
    }

    fn can_spread_out_of(&self, block: BlockId, _side: Side) -> bool {
        // Opaque emitters still shine outwards
        let definition = self.registry.get(block);
        definition.translucent || definition.luminance > 0
    }

    fn can_spread_into(&self, block: BlockId, _side: Side) -> bool {
        self.registry.is_translucent(block)
    }
}

/// Light from the sky.
#[derive(Clone, Debug)]
pub struct SunlightRules {
    registry: Arc<BlockRegistry>,
}

impl SunlightRules {
    /// Creates rules backed by `registry`.
    #[must_use]
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }
}

impl PropagationRules for SunlightRules {
    fn max_value(&self) -> u8 {
        MAX_LIGHT
    }

    fn fixed_value(&self, _block: BlockId) -> u8 {
        0
    }

    fn propagate_value(&self, value: u8, side: Side, _from: BlockId) -> u8 {
        if side == Side::Bottom && value == MAX_LIGHT {
            MAX_LIGHT
        } else {
            value.saturating_sub(1)
        }
    }

    fn can_spread_out_of(&self, block: BlockId, _side: Side) -> bool {
        self.registry.is_translucent(block)
    }

    fn can_spread_into(&self, block: BlockId, _side: Side) -> bool {
        self.registry.is_translucent(block)
    }
}
