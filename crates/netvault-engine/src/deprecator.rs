//! Retention sweep
//!
//! Walks the live part of the archive, reads each entry's timestamp header
//! and moves entries older than the retention window to
//! `deprecated/<Classification>/<identity>`, one revision per entry.
//!
//! The walk skips `deprecated/` and every dot-prefixed name (`.git`, temp
//! files). Per-entry failures are logged and counted; they never abort the
//! sweep. A move that cannot be recorded is rolled back, leaving the entry
//! live for the next sweep. Each move runs inside its own store session, so ingestion commits
//! interleave between entries but never inside one.

use chrono::{DateTime, Utc};
use netvault_core::errors::{ArchiveError, ExError, ExErrorKind};
use netvault_core::model::{deprecated_path, is_reserved_name, parse_header};
use netvault_core::{log_op_end, log_op_error, log_op_start};
use netvault_core_types::schema::OP_SWEEP;
use netvault_store::errors::{io_error, Result};
use netvault_store::VersionedStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use walkdir::WalkDir;

/// Longest header we read before giving up on finding a newline
const HEADER_LIMIT: u64 = 256;

/// Summary of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files examined
    pub scanned: usize,
    /// Live paths moved to the deprecated partition, in walk order
    pub deprecated: Vec<PathBuf>,
    /// Entries skipped because their header is not a timestamp
    pub unparsable: usize,
    /// Entries that were eligible but could not be moved or committed
    pub failed: usize,
}

enum Verdict {
    Fresh,
    Vanished,
    Unparsable,
    Deprecated(PathBuf),
}

/// Moves entries past the retention window into `deprecated/`
#[derive(Clone)]
pub struct ArchiveDeprecator {
    store: Arc<VersionedStore>,
    max_age: Duration,
}

impl ArchiveDeprecator {
    pub fn new(store: Arc<VersionedStore>, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Sweep against the current time
    ///
    /// # Errors
    ///
    /// Only when the tree itself cannot be listed; per-entry failures are
    /// reported in the `SweepReport`.
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the current time were `now`
    ///
    /// # Errors
    ///
    /// See [`ArchiveDeprecator::sweep`].
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let started = Instant::now();
        log_op_start!(OP_SWEEP, max_age_secs = self.max_age.as_secs());

        let result = self.run(now).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => log_op_end!(
                OP_SWEEP,
                duration_ms = duration_ms,
                scanned = report.scanned,
                deprecated = report.deprecated.len(),
                unparsable = report.unparsable,
                failed = report.failed,
            ),
            Err(err) => log_op_error!(OP_SWEEP, err, duration_ms = duration_ms),
        }
        result
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let root = self.store.workdir().to_path_buf();
        let candidates = tokio::task::spawn_blocking(move || list_candidates(&root))
            .await
            .map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op(OP_SWEEP)
                    .with_message(format!("listing task failed: {}", e))
            })?;

        let mut report = SweepReport::default();
        for relative in candidates {
            report.scanned += 1;
            match self.examine(&relative, now).await {
                Ok(Verdict::Fresh) | Ok(Verdict::Vanished) => {}
                Ok(Verdict::Unparsable) => report.unparsable += 1,
                Ok(Verdict::Deprecated(path)) => report.deprecated.push(path),
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        path = %relative.display(),
                        err.code = err.code(),
                        error = %err,
                        "Failed to deprecate entry; continuing sweep"
                    );
                }
            }
        }
        Ok(report)
    }

    /// Decide on and, if eligible, deprecate one entry under a store session
    async fn examine(&self, relative: &Path, now: DateTime<Utc>) -> Result<Verdict> {
        let mut session = self.store.session().await;
        let absolute = session.workdir().join(relative);

        let Some(line) = read_header(&absolute).await? else {
            tracing::debug!(path = %relative.display(), "Entry vanished before it was read");
            return Ok(Verdict::Vanished);
        };

        let header = if line.is_empty() {
            Err(ArchiveError::MissingHeader {
                path: relative.display().to_string(),
            })
        } else {
            parse_header(&line)
        };
        let captured_at = match header {
            Ok(captured_at) => captured_at.with_timezone(&Utc),
            Err(err) => {
                tracing::warn!(
                    path = %relative.display(),
                    error = %err,
                    "Skipping entry with unreadable timestamp"
                );
                return Ok(Verdict::Unparsable);
            }
        };

        // Entries stamped in the future are never eligible
        let eligible = matches!((now - captured_at).to_std(), Ok(age) if age > self.max_age);
        if !eligible {
            return Ok(Verdict::Fresh);
        }

        let target = deprecated_path(relative);
        let message = format!("Deprecated {}", relative.display());
        session.relocate(relative, &target).await?;
        let recorded = async {
            session.stage_add(&target).await?;
            session.stage_removal(relative).await?;
            session.commit(&message).await
        }
        .await;

        // An unrecorded move is undone so the entry stays live and is retried
        let outcome = match recorded {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(rollback) = session.restore_relocation(relative, &target).await {
                    return Err(rollback
                        .with_path(relative.display().to_string())
                        .with_source(err));
                }
                tracing::debug!(path = %relative.display(), "Rolled back unrecorded move");
                return Err(err);
            }
        };

        tracing::info!(
            path = %relative.display(),
            target = %target.display(),
            captured_at = %captured_at,
            revision = outcome.revision().unwrap_or("none"),
            "Deprecated entry"
        );
        Ok(Verdict::Deprecated(relative.to_path_buf()))
    }
}

/// Regular files under `root` outside the reserved names, relative and sorted
fn list_candidates(root: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !is_reserved_name(&entry.file_name().to_string_lossy(), entry.depth())
        });

    let mut candidates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable path during sweep");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            candidates.push(relative.to_path_buf());
        }
    }
    candidates.sort();
    candidates
}

/// First line of a file without its terminator; `None` when the file is gone
async fn read_header(path: &Path) -> Result<Option<String>> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(OP_SWEEP, path, e)),
    };

    let mut line = Vec::new();
    BufReader::new(file.take(HEADER_LIMIT))
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| io_error(OP_SWEEP, path, e))?;

    let line = String::from_utf8_lossy(&line);
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
