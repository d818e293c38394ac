//! Move Manager core library — domain types, device constants, validation.
//!
//! Public API surface:
//! - [`types`] — sets, pages, devices, settings, revision records
//! - [`device`] — the device filesystem contract (paths, xattr keys)
//! - [`validate`] — pure pre-I/O constraint checks
//! - [`error`] — [`ValidationError`]

pub mod device;
pub mod error;
pub mod types;
pub mod validate;

pub use error::ValidationError;
pub use types::{
    CompleteSetMetadata, Device, ManagerMetadata, Page, RevisionAuthor, RevisionRecord, Set,
    SetInPage, SetMetadata, StoredSet, UserSettings,
};
