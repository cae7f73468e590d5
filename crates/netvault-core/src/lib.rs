//! netvault core - domain model and ambient facilities
//!
//! This crate provides the pieces every other netvault crate builds on:
//! - Snapshot, Classification and the persisted Entry layout
//! - The structured error facility (`ExError` / `ExErrorKind`)
//! - The structured logging facility and its test capture mode
//! - `ArchiveConfig`, loaded from TOML and `NETVAULT_*` environment variables

pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;

// Re-export commonly used types
pub use config::ArchiveConfig;
pub use errors::{ArchiveError, ExError, ExErrorKind, Result};
pub use model::{Classification, Snapshot};
