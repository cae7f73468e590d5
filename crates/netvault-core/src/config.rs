//! Archive configuration
//!
//! Loaded from an optional TOML file layered with `NETVAULT_*` environment
//! variables (environment wins), e.g.:
//!
//! ```toml
//! archive_root = "/var/lib/netvault/archive"
//! branch = "main"
//! remote_url = "git@git.example.net:netops/config-backups.git"
//! queue_capacity = 100
//! sync_interval_secs = 10
//! max_age_secs = 86400
//! ```

use crate::errors::{ArchiveError, ExError, ExErrorKind, Result};
use crate::logging_facility::Profile;
use netvault_core_types::Sensitive;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides (`NETVAULT_BRANCH=...`)
pub const ENV_PREFIX: &str = "NETVAULT";

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Working directory of the archive
    pub archive_root: PathBuf,
    /// Branch pulled and pushed
    #[serde(default = "ArchiveConfig::default_branch")]
    pub branch: String,
    /// Origin URL; `None` keeps the archive local-only
    #[serde(default)]
    pub remote_url: Option<Sensitive<String>>,
    /// Bound of the ingestion queue
    #[serde(default = "ArchiveConfig::default_queue_capacity")]
    pub queue_capacity: usize,
    /// Period of the sweep + push tick
    #[serde(default = "ArchiveConfig::default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Retention window; older entries are deprecated
    #[serde(default = "ArchiveConfig::default_max_age_secs")]
    pub max_age_secs: u64,
    /// Commit author name
    #[serde(default = "ArchiveConfig::default_author_name")]
    pub author_name: String,
    /// Commit author email
    #[serde(default = "ArchiveConfig::default_author_email")]
    pub author_email: String,
    #[serde(default)]
    pub log_profile: Profile,
}

impl ArchiveConfig {
    fn default_branch() -> String {
        "main".to_string()
    }
    fn default_queue_capacity() -> usize {
        100
    }
    fn default_sync_interval_secs() -> u64 {
        10
    }
    fn default_max_age_secs() -> u64 {
        24 * 60 * 60
    }
    fn default_author_name() -> String {
        "netvault".to_string()
    }
    fn default_author_email() -> String {
        "netvault@localhost".to_string()
    }

    /// Local-only configuration with defaults for everything but the root
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
            branch: Self::default_branch(),
            remote_url: None,
            queue_capacity: Self::default_queue_capacity(),
            sync_interval_secs: Self::default_sync_interval_secs(),
            max_age_secs: Self::default_max_age_secs(),
            author_name: Self::default_author_name(),
            author_email: Self::default_author_email(),
            log_profile: Profile::default(),
        }
    }

    /// Set the remote origin
    pub fn with_remote(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(Sensitive::new(url.into()));
        self
    }

    /// Load from an optional TOML file plus environment overrides
    ///
    /// # Errors
    ///
    /// `ERR_CONFIG` when the file is unreadable, a value has the wrong type,
    /// `archive_root` is missing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder =
            builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let loaded: ArchiveConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| {
                ExError::new(ExErrorKind::Config)
                    .with_op("load_config")
                    .with_message(e.to_string())
            })?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject values the archive cannot run with
    ///
    /// # Errors
    ///
    /// `ERR_CONFIG` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(ArchiveError::InvalidConfig {
                reason: reason.to_string(),
            }
            .into())
        };

        if self.archive_root.as_os_str().is_empty() {
            return invalid("archive_root must not be empty");
        }
        if self.branch.trim().is_empty() {
            return invalid("branch must not be empty");
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity must be at least 1");
        }
        if self.sync_interval_secs == 0 {
            return invalid("sync_interval_secs must be at least 1");
        }
        if self.max_age_secs == 0 {
            return invalid("max_age_secs must be at least 1");
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let cfg = ArchiveConfig::new("/tmp/archive");
        assert_eq!(cfg.branch, "main");
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.sync_interval(), Duration::from_secs(10));
        assert_eq!(cfg.max_age(), Duration::from_secs(86_400));
        assert!(cfg.remote_url.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut cfg = ArchiveConfig::new("/tmp/archive");
        cfg.queue_capacity = 0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
        assert!(err.message().contains("queue_capacity"));
    }

    #[test]
    fn test_debug_redacts_remote() {
        let cfg = ArchiveConfig::new("/tmp/archive").with_remote("https://bot:s3cret@h/r.git");
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("s3cret"));
    }
}
