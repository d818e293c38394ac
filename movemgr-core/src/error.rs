//! Error types for movemgr-core.

use thiserror::Error;

/// Constraint violations on set fields, raised before any network or disk
/// mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Grid slot outside the device's 32-pad grid.
    #[error("index {index} is out of range (expected 0..=31)")]
    IndexOutOfRange { index: u8 },

    /// Color outside the device palette.
    #[error("color {color} is out of range (expected 0..=26)")]
    ColorOutOfRange { color: u8 },

    /// Set names double as device directory names and must be non-empty.
    #[error("set name is empty")]
    NameEmpty,

    /// Device display limit.
    #[error("set name {name:?} is too long (max 32 characters)")]
    NameTooLong { name: String },

    /// A slash would escape the set directory on the device filesystem.
    #[error("set name {name:?} contains a slash")]
    NameContainsSlash { name: String },
}
