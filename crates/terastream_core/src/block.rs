//! # Block Registry
//!
//! Maps numeric block ids to the two properties the streaming core cares
//! about: translucency (does light pass) and luminance (does it emit light).
//!
//! The registry is an explicit context object. Build it once at startup,
//! wrap it in an `Arc` and hand it to every component that needs it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk::MAX_LIGHT;
use crate::error::{CoreError, CoreResult};

/// Numeric block id as stored in a chunk's block field.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(pub u16);

impl BlockId {
    /// Air. Always registered, always translucent.
    pub const AIR: Self = Self(0);

    /// Returns true for air.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static properties of one block type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    /// Numeric id.
    pub id: BlockId,
    /// Human-readable name.
    pub name: String,
    /// Light passes through translucent blocks.
    #[serde(default)]
    pub translucent: bool,
    /// Light emitted by the block, `0..=MAX_LIGHT`.
    #[serde(default)]
    pub luminance: u8,
}

impl BlockDefinition {
    /// The air definition.
    #[must_use]
    pub fn air() -> Self {
        Self::translucent(BlockId::AIR, "air")
    }

    /// An opaque, non-emitting block.
    #[must_use]
    pub fn opaque(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            translucent: false,
            luminance: 0,
        }
    }

    /// A translucent, non-emitting block.
    #[must_use]
    pub fn translucent(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            translucent: true,
            luminance: 0,
        }
    }

    /// Sets the emitted light level.
    #[must_use]
    pub const fn with_luminance(mut self, luminance: u8) -> Self {
        self.luminance = luminance;
        self
    }
}

/// TOML document layout: a list of `[[blocks]]` tables.
#[derive(Debug, Deserialize)]
struct BlocksFile {
    #[serde(default)]
    blocks: Vec<BlockDefinition>,
}

/// Registry of block definitions.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: HashMap<BlockId, BlockDefinition>,
    /// Returned for ids nobody registered.
    fallback: BlockDefinition,
}

impl BlockRegistry {
    /// Creates a registry holding only air.
    #[must_use]
    pub fn new() -> Self {
        let air = BlockDefinition::air();
        Self {
            blocks: HashMap::from([(air.id, air)]),
            fallback: BlockDefinition::opaque(BlockId(u16::MAX), "unknown"),
        }
    }

    /// Builds a registry from a list of definitions.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn from_definitions<I>(definitions: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = BlockDefinition>,
    {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Parses `[[blocks]]` tables from a TOML document.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on parse failure or an invalid definition.
    pub fn from_toml_str(source: &str) -> CoreResult<Self> {
        let file: BlocksFile =
            toml::from_str(source).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        Self::from_definitions(file.blocks)
    }

    /// Adds a definition.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the id is already taken, the luminance exceeds
    /// `MAX_LIGHT`, or the definition tries to make air opaque or emissive.
    pub fn register(&mut self, definition: BlockDefinition) -> CoreResult<()> {
        if definition.luminance > MAX_LIGHT {
            return Err(CoreError::InvalidConfig(format!(
                "block {} luminance {} exceeds {MAX_LIGHT}",
                definition.name, definition.luminance
            )));
        }
        if definition.id.is_air() {
            if !definition.translucent || definition.luminance != 0 {
                return Err(CoreError::InvalidConfig(
                    "air must be translucent and dark".to_string(),
                ));
            }
            self.blocks.insert(BlockId::AIR, definition);
            return Ok(());
        }
        if let Some(existing) = self.blocks.get(&definition.id) {
            return Err(CoreError::InvalidConfig(format!(
                "block id {} registered twice ({} and {})",
                definition.id, existing.name, definition.name
            )));
        }
        self.blocks.insert(definition.id, definition);
        Ok(())
    }

    /// Definition for `id`, or the opaque fallback for unknown ids.
    #[inline]
    #[must_use]
    pub fn get(&self, id: BlockId) -> &BlockDefinition {
        self.blocks.get(&id).unwrap_or(&self.fallback)
    }

    /// Returns true if `id` was registered.
    #[must_use]
    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// Shorthand for `get(id).translucent`.
    #[inline]
    #[must_use]
    pub fn is_translucent(&self, id: BlockId) -> bool {
        self.get(id).translucent
    }

    /// Shorthand for `get(id).luminance`.
    #[inline]
    #[must_use]
    pub fn luminance(&self, id: BlockId) -> u8 {
        self.get(id).luminance
    }

    /// Looks a block up by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&BlockDefinition> {
        self.blocks.values().find(|b| b.name == name)
    }

    /// Number of registered blocks, air included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: air is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All registered definitions, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.blocks.values()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_always_present() {
        let registry = BlockRegistry::new();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_translucent(BlockId::AIR));
        assert_eq!(registry.luminance(BlockId::AIR), 0);
    }

    #[test]
    fn test_unknown_id_is_opaque() {
        let registry = BlockRegistry::new();
        assert!(!registry.contains(BlockId(77)));
        assert!(!registry.is_translucent(BlockId(77)));
        assert_eq!(registry.luminance(BlockId(77)), 0);
    }

    #[test]
    fn test_register_rejects_duplicates_and_bright_blocks() {
        let mut registry = BlockRegistry::new();
        registry.register(BlockDefinition::opaque(BlockId(1), "stone")).unwrap();
        assert!(registry.register(BlockDefinition::opaque(BlockId(1), "granite")).is_err());

        let lava = BlockDefinition::opaque(BlockId(2), "lava").with_luminance(16);
        assert!(matches!(registry.register(lava), Err(CoreError::InvalidConfig(_))));

        let dark_air = BlockDefinition::opaque(BlockId::AIR, "void");
        assert!(registry.register(dark_air).is_err());
    }

    #[test]
    fn test_from_toml() {
        let source = r#"
            [[blocks]]
            id = 1
            name = "stone"

            [[blocks]]
            id = 2
            name = "glass"
            translucent = true

            [[blocks]]
            id = 3
            name = "torch"
            translucent = true
            luminance = 14
        "#;
        let registry = BlockRegistry::from_toml_str(source).unwrap();
        assert_eq!(registry.len(), 4);
        assert!(!registry.is_translucent(BlockId(1)));
        assert!(registry.is_translucent(BlockId(2)));
        assert_eq!(registry.luminance(BlockId(3)), 14);
        assert_eq!(registry.by_name("glass").map(|b| b.id), Some(BlockId(2)));
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(BlockRegistry::from_toml_str("blocks = 7").is_err());
    }
}
