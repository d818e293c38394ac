//! Error types for movemgr-client.

use std::path::PathBuf;

use thiserror::Error;

use movemgr_core::ValidationError;

/// All errors that can arise from the SSH/SFTP device client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TCP connection to the device failed.
    #[error("cannot reach {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// An error from the SSH transport or SFTP subsystem.
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    /// An operation was attempted before `connect()`.
    #[error("device session not connected")]
    NotConnected,

    /// Pre-upload constraint violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A set directory did not contain exactly one inner content directory.
    /// Signals device-side corruption.
    #[error("set directory {path} contains {found} inner directories, expected exactly 1")]
    CorruptSetDir { path: String, found: usize },

    /// A remote shell command exited non-zero.
    #[error("remote command {command:?} failed: {stderr}")]
    RemoteCommand { command: String, stderr: String },

    /// Reading a remote command's output channel failed mid-stream.
    #[error("remote command {command:?} I/O failed: {source}")]
    Exec {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An extended attribute required by the metadata codec was absent.
    #[error("extended attribute {key} missing on {path}")]
    MissingAttribute { key: String, path: String },

    /// An extended attribute value did not parse as the expected type.
    #[error("extended attribute {key} has unparseable value {value:?}")]
    BadAttribute { key: String, value: String },
}

/// Convenience constructor for [`ClientError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ClientError {
    ClientError::Io {
        path: path.into(),
        source,
    }
}

/// All errors that can arise from the challenge-auth HTTP client.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport-level HTTP failure (DNS, TCP, TLS, timeouts).
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The device answered with a non-success status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Local I/O failure while writing a downloaded bundle.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
