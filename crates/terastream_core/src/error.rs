//! # Core Error Types
//!
//! All errors that can occur while addressing, mutating or decoding voxel data.

use thiserror::Error;

use crate::coord::Extent3;

/// Errors raised by packed arrays, chunks and the block registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A local coordinate was outside the array bounds. Always a caller bug.
    #[error("coordinate ({x}, {y}, {z}) outside array bounds {dims}")]
    OutOfRange {
        /// Requested X.
        x: usize,
        /// Requested Y.
        y: usize,
        /// Requested Z.
        z: usize,
        /// Bounds of the array.
        dims: Extent3,
    },

    /// A value does not fit the array's bit width and the array rejects widening.
    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide {
        /// The rejected value.
        value: u16,
        /// The array's bit width.
        bits: u8,
    },

    /// Serialized bytes could not be decoded.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Invalid block registry configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
