//! Persisted entry layout
//!
//! Live entries: `<root>/<Classification>/<identity>`.
//! Retired entries: `<root>/deprecated/<Classification>/<identity>`.
//! Content: an RFC3339 capture timestamp, a newline, then the payload. The
//! first line is the only source of an entry's age.

use crate::errors::ArchiveError;
use crate::model::classification::Classification;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::path::{Path, PathBuf};

/// Partition holding retired entries, directly under the archive root
pub const DEPRECATED_DIR: &str = "deprecated";

/// Version-control metadata directory, never treated as device data
pub const METADATA_DIR: &str = ".git";

/// Live entry path relative to the archive root
pub fn entry_path(classification: Classification, identity: &str) -> PathBuf {
    Path::new(classification.as_str()).join(identity)
}

/// Mirror a live relative path under the deprecated partition
pub fn deprecated_path(relative: &Path) -> PathBuf {
    Path::new(DEPRECATED_DIR).join(relative)
}

/// Whether a directory entry at `depth` below the root must be skipped
///
/// Dot-prefixed names (VCS metadata, temp files) are reserved at every
/// depth; `deprecated` only at the top level.
pub fn is_reserved_name(name: &str, depth: usize) -> bool {
    name.starts_with('.') || (depth == 1 && name == DEPRECATED_DIR)
}

/// Render entry content from a capture time and payload
pub fn render_entry(captured_at: &DateTime<Utc>, payload: &[u8]) -> Vec<u8> {
    let header = captured_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut content = Vec::with_capacity(header.len() + 1 + payload.len());
    content.extend_from_slice(header.as_bytes());
    content.push(b'\n');
    content.extend_from_slice(payload);
    content
}

/// Parse an entry's first line as its capture timestamp
///
/// # Errors
///
/// `ArchiveError::InvalidTimestamp` when the line is not RFC3339.
pub fn parse_header(line: &str) -> Result<DateTime<FixedOffset>, ArchiveError> {
    let trimmed = line.trim_end_matches(&['\r', '\n'][..]);
    DateTime::parse_from_rfc3339(trimmed).map_err(|e| ArchiveError::InvalidTimestamp {
        line: trimmed.chars().take(64).collect(),
        reason: e.to_string(),
    })
}
