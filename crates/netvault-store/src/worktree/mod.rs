//! Working-tree primitives
//!
//! Provides:
//! - Atomic file replacement (temp file + rename)
//! - Validation of archive-relative paths

mod atomic;
mod paths;

pub use atomic::atomic_write;
pub use paths::validate_relative;
