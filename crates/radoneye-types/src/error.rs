//! Error types for data parsing in radoneye-types.

use thiserror::Error;

/// Errors that can occur when parsing RadonEye frames and values.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in radoneye-core).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Failed to parse data due to insufficient or malformed bytes.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A unit name or wire unit byte is not one of the supported units.
    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

impl ParseError {
    /// Create an error for a frame shorter than its layout requires.
    pub fn too_short(what: &str, expected: usize, actual: usize) -> Self {
        Self::InvalidData(format!(
            "{what}: expected at least {expected} bytes, got {actual}"
        ))
    }
}

/// Result type alias using radoneye-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
