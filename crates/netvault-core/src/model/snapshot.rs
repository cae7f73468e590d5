//! Captured device configurations

use crate::errors::{ArchiveError, Result};
use crate::model::classification::Classification;
use crate::model::entry::{entry_path, render_entry};
use chrono::{DateTime, Utc};
use netvault_core_types::RequestId;
use std::path::PathBuf;

/// One captured configuration awaiting persistence
///
/// Created per backup event, submitted once and consumed exactly once by the
/// ingestion worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    identity: String,
    payload: Vec<u8>,
    captured_at: DateTime<Utc>,
    request_id: RequestId,
}

impl Snapshot {
    /// Capture a snapshot now
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` when the identity cannot be used as a file name.
    pub fn new(identity: impl Into<String>, payload: impl Into<Vec<u8>>) -> Result<Self> {
        let identity = identity.into();
        validate_identity(&identity)?;
        Ok(Self {
            identity,
            payload: payload.into(),
            captured_at: Utc::now(),
            request_id: RequestId::new(),
        })
    }

    /// Override the capture time
    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Reuse a request id minted by the transport
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn classification(&self) -> Classification {
        Classification::from_identity(&self.identity)
    }

    /// Live entry path relative to the archive root
    pub fn relative_path(&self) -> PathBuf {
        entry_path(self.classification(), &self.identity)
    }

    /// Persisted entry content: timestamp line followed by the payload
    pub fn render(&self) -> Vec<u8> {
        render_entry(&self.captured_at, &self.payload)
    }

    pub fn commit_message(&self) -> String {
        format!("Updated configuration for device {}", self.identity)
    }
}

/// Check that an identity is usable as a single archive file name
///
/// # Errors
///
/// `ERR_INVALID_INPUT` for empty names, path separators, `.`/`..`, names
/// starting with a dot (reserved for VCS metadata and temp files) and
/// control characters.
pub fn validate_identity(identity: &str) -> Result<()> {
    let reject = |reason: &str| -> Result<()> {
        Err(ArchiveError::InvalidIdentity {
            identity: identity.to_string(),
            reason: reason.to_string(),
        }
        .into())
    };

    if identity.is_empty() {
        return reject("identity is empty");
    }
    if identity.contains('/') || identity.contains('\\') {
        return reject("identity contains a path separator");
    }
    if identity.starts_with('.') {
        return reject("identity starts with '.'");
    }
    if identity.chars().any(char::is_control) {
        return reject("identity contains control characters");
    }
    Ok(())
}
