//! # World Configuration
//!
//! One TOML file describes storage, the worker pool and the block set:
//!
//! ```toml
//! [storage]
//! backend = "file"
//! root = "saves/alpha/chunks"
//! compression = "zstd"
//!
//! [tasks]
//! workers = 4
//!
//! [[blocks]]
//! id = 1
//! name = "stone"
//!
//! [[blocks]]
//! id = 2
//! name = "torch"
//! translucent = true
//! luminance = 14
//! ```
//!
//! Every table is optional and falls back to its defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use terastream_core::{BlockDefinition, BlockRegistry, CoreError};
use terastream_storage::StorageConfig;
use terastream_tasks::TaskQueueConfig;
use thiserror::Error;

/// Errors raised while reading a world configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the layout.
    #[error("failed to parse world config: {0}")]
    Parse(String),

    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// A block definition was rejected by the registry.
    #[error("invalid block definitions: {0}")]
    Blocks(#[from] CoreError),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete world configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk store settings.
    pub storage: StorageConfig,
    /// Worker pool sizing.
    pub tasks: TaskQueueConfig,
    /// Registered blocks. Air is implicit.
    pub blocks: Vec<BlockDefinition>,
}

impl WorldConfig {
    /// Production defaults with no blocks beyond air.
    #[must_use]
    pub fn production() -> Self {
        Self {
            storage: StorageConfig::production(),
            tasks: TaskQueueConfig::production(),
            blocks: Vec::new(),
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed documents.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Parse` if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), blocks = config.blocks.len(), "loaded world config");
        Ok(config)
    }

    /// Builds the block registry.
    ///
    /// # Errors
    ///
    /// `Blocks` for duplicate ids or out-of-range luminance.
    pub fn registry(&self) -> ConfigResult<BlockRegistry> {
        Ok(BlockRegistry::from_definitions(self.blocks.iter().cloned())?)
    }
}
