//! # movemgr-client
//!
//! Device-facing clients: the SSH/SFTP session that moves set bundles and
//! extended-attribute metadata, and the challenge-auth HTTP client that
//! authorizes `.abl` bundle downloads.
//!
//! The [`DeviceClient`] and [`BundleClient`] traits are the seams the sync
//! orchestrator is written against.

pub mod config;
pub mod copy;
pub mod error;
pub mod rest;
pub mod ssh;
pub mod xattr;

pub use config::{DeviceConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USERNAME};
pub use copy::CopyPolicy;
pub use error::{ClientError, RestError};
pub use rest::{BundleClient, RestApiClient, CHALLENGE_COOKIE_NAME};
pub use ssh::{DeviceClient, SshDeviceClient};
