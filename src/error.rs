//! Error types for bucket-sync

use thiserror::Error;

/// Result type alias for bucket-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for bucket-sync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Container {container} unavailable: {reason}")]
    ContainerUnavailable { container: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid relative path: {0}")]
    InvalidPath(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Check if error is retryable
    ///
    /// The sync engine never retries on its own; this is for callers that
    /// wrap push/pull in their own backoff loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(_) => true,
            SyncError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Map an IO error on `path`, turning `NotFound` into [`SyncError::NotFound`]
    pub(crate) fn from_io(path: impl AsRef<std::path::Path>, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            SyncError::NotFound(path.as_ref().display().to_string())
        } else {
            SyncError::Io(e)
        }
    }
}
