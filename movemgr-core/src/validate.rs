//! Pure constraint checks for set fields.
//!
//! All checks are cheap and local so callers can validate before opening a
//! device session or touching disk. They return error kinds rather than
//! panicking, which lets batch operations compose them without control-flow
//! tricks.

use crate::error::ValidationError;

/// Highest valid grid slot.
pub const MAX_INDEX: u8 = 31;

/// Highest valid pad color.
pub const MAX_COLOR: u8 = 26;

/// Longest allowed set name (also the alias limit in pages).
pub const MAX_NAME_LEN: usize = 32;

/// Check a grid slot index against the 32-pad grid.
pub fn check_index(index: u8) -> Result<(), ValidationError> {
    if index > MAX_INDEX {
        return Err(ValidationError::IndexOutOfRange { index });
    }
    Ok(())
}

/// Check a pad color against the device palette.
pub fn check_color(color: u8) -> Result<(), ValidationError> {
    if color > MAX_COLOR {
        return Err(ValidationError::ColorOutOfRange { color });
    }
    Ok(())
}

/// Check a set name and return its trimmed form.
///
/// The trimmed name is what gets used as the bundle directory name on the
/// device, so it must be non-empty, at most [`MAX_NAME_LEN`] characters, and
/// free of path separators.
pub fn check_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            name: name.to_string(),
        });
    }
    if name.contains('/') {
        return Err(ValidationError::NameContainsSlash {
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}
