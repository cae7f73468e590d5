//! netvault engine - orchestration layer
//!
//! Coordinates the archive's moving parts around one `VersionedStore`:
//! - `IngestionPipeline`: bounded queue feeding a single commit worker
//! - `ArchiveDeprecator`: moves entries past the retention window to `deprecated/`
//! - `Synchronizer`: periodic sweep + push
//! - `ArchiveService`: startup sequence and start/stop lifecycle

pub mod deprecator;
pub mod pipeline;
pub mod service;
pub mod synchronizer;

pub use deprecator::{ArchiveDeprecator, SweepReport};
pub use pipeline::{IngestionPipeline, IngestionReport, SnapshotSubmitter};
pub use service::ArchiveService;
pub use synchronizer::{SyncPhase, Synchronizer, TickReport};
