//! # movemgr-store
//!
//! Git-versioned local store — the authoritative offline copy of sets,
//! pages, devices and settings between sync sessions.
//!
//! Open a [`LocalStore`], bracket mutations in a
//! [`StoreTransaction`](transaction::StoreTransaction), and query history
//! through the revision API.

pub mod error;
pub mod history;
pub mod store;
pub mod transaction;

pub use error::StoreError;
pub use store::LocalStore;
pub use transaction::StoreTransaction;
