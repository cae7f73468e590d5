//! Error helpers for netvault-store
//!
//! Wraps netvault-core ExError with store-specific constructors

use netvault_core::errors::{ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error for a working-tree path
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_path(path.display().to_string())
        .with_message(err.to_string())
}

/// Create a remote transport error
pub fn transport_error(operation: &str, detail: &str) -> ExError {
    ExError::new(ExErrorKind::Transport)
        .with_op(operation.to_string())
        .with_message(detail.to_string())
}

/// Create an add/rm/commit error
pub fn commit_error(operation: &str, detail: &str) -> ExError {
    ExError::new(ExErrorKind::Commit)
        .with_op(operation.to_string())
        .with_message(detail.to_string())
}

/// Create an error for a path that may not be written through the store
pub fn invalid_path(path: &Path, reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("validate_path")
        .with_path(path.display().to_string())
        .with_message(reason.to_string())
}
