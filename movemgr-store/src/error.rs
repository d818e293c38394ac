//! Error types for movemgr-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error from the underlying git repository.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// JSON parse/serialize error on a store document.
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A revision object reference (`<rev>:<path>`) did not resolve to a file.
    #[error("revision {spec} does not name a file")]
    NotAFile { spec: String },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
