//! Error types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading or saving the document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred (disk full, permission denied, ...).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted content is not a valid document.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Another process holds the data file.
    #[error("data file locked by another process: {}", .0.display())]
    Locked(PathBuf),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            StoreError::Io(err.into())
        } else {
            StoreError::CorruptData(err.to_string())
        }
    }
}
