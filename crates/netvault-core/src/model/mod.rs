//! Archive domain model
//!
//! A `Snapshot` is one captured device configuration. It is persisted as an
//! entry at `<Classification>/<identity>` whose first line is the capture
//! timestamp. Retired entries live under `deprecated/`, mirroring their live
//! path.

pub mod classification;
pub mod entry;
pub mod snapshot;

pub use classification::Classification;
pub use entry::{
    deprecated_path, entry_path, is_reserved_name, parse_header, render_entry, DEPRECATED_DIR,
    METADATA_DIR,
};
pub use snapshot::{validate_identity, Snapshot};
