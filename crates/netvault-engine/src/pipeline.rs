//! Ingestion pipeline
//!
//! Producers hand snapshots to a `SnapshotSubmitter`; a single worker task
//! drains the bounded queue in arrival order and commits each snapshot
//! through the store. `submit` waits while the queue is full. Closing the
//! pipeline rejects new submissions, lets the worker commit what is already
//! queued, then stops it.

use netvault_core::errors::{ArchiveError, ExError, ExErrorKind};
use netvault_core::{log_op_end, log_op_error, log_op_start, Snapshot};
use netvault_core_types::schema::OP_PERSIST_SNAPSHOT;
use netvault_core_types::RequestId;
use netvault_store::errors::Result;
use netvault_store::{CommitOutcome, VersionedStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the worker did with the snapshots it dequeued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// Snapshots that produced a new revision
    pub committed: usize,
    /// Snapshots identical to what was already archived
    pub unchanged: usize,
    /// Snapshots whose write or commit failed
    pub failed: usize,
}

impl IngestionReport {
    pub fn processed(&self) -> usize {
        self.committed + self.unchanged + self.failed
    }
}

/// Cloneable producer side of the queue
#[derive(Debug, Clone)]
pub struct SnapshotSubmitter {
    tx: mpsc::Sender<Snapshot>,
    closed: CancellationToken,
}

impl SnapshotSubmitter {
    /// Enqueue a snapshot, waiting for space when the queue is full
    ///
    /// Success means the snapshot was accepted, not that it was committed.
    ///
    /// # Errors
    ///
    /// `ERR_QUEUE_CLOSED` when the pipeline was closed before (or while
    /// waiting for) a free slot.
    pub async fn submit(&self, snapshot: Snapshot) -> Result<()> {
        let identity = snapshot.identity().to_string();
        if self.closed.is_cancelled() {
            return Err(ExError::from(ArchiveError::QueueClosed { identity }));
        }

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => {
                Err(ExError::from(ArchiveError::QueueClosed { identity }))
            }
            sent = self.tx.send(snapshot) => {
                sent.map_err(|_| ExError::from(ArchiveError::QueueClosed { identity }))
            }
        }
    }

    /// Build a snapshot from a raw capture and enqueue it
    ///
    /// Returns the request id that tags the snapshot in every log line.
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` for an unusable identity (nothing is enqueued),
    /// otherwise as [`SnapshotSubmitter::submit`].
    pub async fn accept(
        &self,
        identity: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Result<RequestId> {
        let snapshot = Snapshot::new(identity, payload)?;
        let request_id = snapshot.request_id().clone();
        self.submit(snapshot).await?;
        Ok(request_id)
    }

    /// Free slots in the queue right now
    pub fn available_slots(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

/// Bounded queue plus its single commit worker
pub struct IngestionPipeline {
    submitter: SnapshotSubmitter,
    worker: JoinHandle<IngestionReport>,
}

impl IngestionPipeline {
    /// Spawn the worker on the current runtime
    ///
    /// `capacity` is clamped to at least one slot.
    pub fn start(store: Arc<VersionedStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let closed = CancellationToken::new();
        let worker = tokio::spawn(run_worker(store, rx, closed.clone()));

        tracing::info!(capacity = capacity.max(1), "Ingestion pipeline started");
        Self {
            submitter: SnapshotSubmitter { tx, closed },
            worker,
        }
    }

    pub fn submitter(&self) -> SnapshotSubmitter {
        self.submitter.clone()
    }

    /// Stop accepting snapshots; queued ones are still committed
    pub fn close(&self) {
        self.submitter.closed.cancel();
    }

    /// Close the queue and wait for the worker to drain it
    ///
    /// # Errors
    ///
    /// `ERR_INTERNAL` if the worker task panicked.
    pub async fn shutdown(self) -> Result<IngestionReport> {
        self.close();
        let report = self.worker.await.map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("ingestion_shutdown")
                .with_message(format!("ingestion worker failed: {}", e))
        })?;

        tracing::info!(
            committed = report.committed,
            unchanged = report.unchanged,
            failed = report.failed,
            "Ingestion pipeline stopped"
        );
        Ok(report)
    }
}

async fn run_worker(
    store: Arc<VersionedStore>,
    mut rx: mpsc::Receiver<Snapshot>,
    closed: CancellationToken,
) -> IngestionReport {
    let mut report = IngestionReport::default();

    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(snapshot) => persist(&store, snapshot, &mut report).await,
                None => break,
            },
            _ = closed.cancelled() => break,
        }
    }

    // Closed: refuse new sends, commit whatever is already buffered
    rx.close();
    while let Some(snapshot) = rx.recv().await {
        persist(&store, snapshot, &mut report).await;
    }
    report
}

async fn persist(store: &VersionedStore, snapshot: Snapshot, report: &mut IngestionReport) {
    let started = Instant::now();
    let request_id = snapshot.request_id().clone();
    let classification = snapshot.classification();
    log_op_start!(
        OP_PERSIST_SNAPSHOT,
        request_id = request_id.as_str(),
        identity = snapshot.identity(),
        classification = classification.as_str(),
    );

    let result = store
        .write_and_commit(
            &snapshot.relative_path(),
            &snapshot.render(),
            &snapshot.commit_message(),
        )
        .await;

    let duration_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(CommitOutcome::Committed { revision }) => {
            report.committed += 1;
            log_op_end!(
                OP_PERSIST_SNAPSHOT,
                duration_ms = duration_ms,
                request_id = request_id.as_str(),
                identity = snapshot.identity(),
                revision = revision.as_str(),
            );
        }
        Ok(CommitOutcome::NothingToCommit) => {
            report.unchanged += 1;
            log_op_end!(
                OP_PERSIST_SNAPSHOT,
                duration_ms = duration_ms,
                request_id = request_id.as_str(),
                identity = snapshot.identity(),
                unchanged = true,
            );
        }
        Err(err) => {
            report.failed += 1;
            let err = err
                .with_identity(snapshot.identity())
                .with_request_id(request_id.clone());
            log_op_error!(
                OP_PERSIST_SNAPSHOT,
                &err,
                duration_ms = duration_ms,
                request_id = request_id.as_str(),
                identity = snapshot.identity(),
            );
        }
    }
}
