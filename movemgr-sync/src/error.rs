//! Error types for movemgr-sync.

use thiserror::Error;

use movemgr_client::{ClientError, RestError};
use movemgr_core::ValidationError;
use movemgr_store::StoreError;

/// All errors that can arise from orchestrated sync operations.
///
/// Validation variants are raised before any remote or disk mutation;
/// transport and store errors propagate unmodified from the underlying
/// layer.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Index/color/name constraint violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The target grid slot already holds another set.
    #[error("index {index} is already occupied by {occupant}")]
    IndexTaken { index: u8, occupant: String },

    /// Two entries of one page claim the same grid slot.
    #[error("index {index} is assigned twice in this page")]
    DuplicatePageIndex { index: u8 },

    /// Referenced set is absent from the local store.
    #[error("set {id} not found")]
    SetNotFound { id: String },

    /// Referenced page is absent from the local store.
    #[error("page {id} not found")]
    PageNotFound { id: String },

    /// Referenced device was never seen.
    #[error("device {id} not found")]
    DeviceNotFound { id: String },

    /// An error from the device session.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An error from the challenge-auth HTTP client.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// An error from the local store.
    #[error(transparent)]
    Store(#[from] StoreError),
}
