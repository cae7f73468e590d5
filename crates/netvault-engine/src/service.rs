//! Archive lifecycle
//!
//! `bootstrap` brings the working directory to a usable state: with a remote
//! it clones, links upstream and pulls; without one it initializes a local
//! repository. Any failure there is fatal. `start` then launches the
//! ingestion worker and the synchronizer; `shutdown` drains the queue,
//! stops the synchronizer at its next tick boundary and joins both.

use crate::pipeline::{IngestionPipeline, IngestionReport, SnapshotSubmitter};
use crate::synchronizer::Synchronizer;
use netvault_core::errors::{ExError, ExErrorKind};
use netvault_core::{logging_facility, ArchiveConfig};
use netvault_store::errors::Result;
use netvault_store::VersionedStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Running {
    pipeline: IngestionPipeline,
    cancel: CancellationToken,
    synchronizer: JoinHandle<()>,
}

pub struct ArchiveService {
    config: ArchiveConfig,
    store: Arc<VersionedStore>,
    running: Option<Running>,
}

impl ArchiveService {
    /// Install logging, validate `config` and prepare a git-backed archive
    ///
    /// # Errors
    ///
    /// `ERR_CONFIG` for invalid settings; otherwise as
    /// [`ArchiveService::bootstrap_with`].
    pub async fn bootstrap(config: ArchiveConfig) -> Result<Self> {
        logging_facility::init(config.log_profile);
        config.validate()?;
        let store = Arc::new(VersionedStore::git(&config));
        Self::bootstrap_with(config, store).await
    }

    /// Prepare the archive using an already constructed store
    ///
    /// # Errors
    ///
    /// `ERR_CLONE`, `ERR_UPSTREAM` or `ERR_TRANSPORT` when the remote cannot
    /// be cloned, linked or pulled; `ERR_IO` when a local archive cannot be
    /// initialized.
    pub async fn bootstrap_with(
        config: ArchiveConfig,
        store: Arc<VersionedStore>,
    ) -> Result<Self> {
        match &config.remote_url {
            Some(remote) => {
                tracing::info!(
                    root = %store.workdir().display(),
                    remote = %remote,
                    branch = %config.branch,
                    "Bootstrapping archive from remote"
                );
                store.clone_remote(remote).await?;
                store.set_upstream().await?;
                store.pull().await?;
            }
            None => {
                tracing::info!(
                    root = %store.workdir().display(),
                    "Bootstrapping local-only archive"
                );
                store.initialize().await?;
            }
        }

        Ok(Self {
            config,
            store,
            running: None,
        })
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Launch the ingestion worker and the synchronizer
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` if the service is already running.
    pub fn start(&mut self) -> Result<SnapshotSubmitter> {
        if self.running.is_some() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("start")
                .with_message("archive service is already running"));
        }

        let pipeline = IngestionPipeline::start(self.store.clone(), self.config.queue_capacity);
        let mut synchronizer = Synchronizer::new(
            self.store.clone(),
            self.config.sync_interval(),
            self.config.max_age(),
        );
        if self.config.remote_url.is_none() {
            synchronizer = synchronizer.local_only();
        }
        let cancel = CancellationToken::new();
        let handle = synchronizer.spawn(cancel.clone());

        let submitter = pipeline.submitter();
        self.running = Some(Running {
            pipeline,
            cancel,
            synchronizer: handle,
        });
        Ok(submitter)
    }

    /// Producer handle of the running pipeline
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` if the service has not been started.
    pub fn submitter(&self) -> Result<SnapshotSubmitter> {
        self.running
            .as_ref()
            .map(|running| running.pipeline.submitter())
            .ok_or_else(|| {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("submitter")
                    .with_message("archive service is not running")
            })
    }

    /// Drain the queue, then stop the synchronizer
    ///
    /// Returns an empty report when the service was never started.
    ///
    /// # Errors
    ///
    /// `ERR_INTERNAL` if either background task panicked.
    pub async fn shutdown(&mut self) -> Result<IngestionReport> {
        let Some(running) = self.running.take() else {
            return Ok(IngestionReport::default());
        };

        let report = running.pipeline.shutdown().await?;
        running.cancel.cancel();
        running.synchronizer.await.map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("shutdown")
                .with_message(format!("synchronizer failed: {}", e))
        })?;

        tracing::info!(
            committed = report.committed,
            unchanged = report.unchanged,
            failed = report.failed,
            "Archive service stopped"
        );
        Ok(report)
    }
}
