//! Periodic sweep + push
//!
//! Every tick runs the retention sweep, then pushes, whatever the sweep's
//! outcome. Failures of either step are logged and the loop re-arms. The
//! loop observes cancellation only between ticks; a running tick always
//! completes.

use crate::deprecator::{ArchiveDeprecator, SweepReport};
use netvault_core::{log_op_end, log_op_start};
use netvault_core_types::schema::OP_SYNC_TICK;
use netvault_store::{SyncOutcome, VersionedStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Where the synchronizer is within its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Sweeping,
    Pushing,
}

/// Outcome of one tick; `None` marks a step that failed or was skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sweep: Option<SweepReport>,
    pub push: Option<SyncOutcome>,
}

pub struct Synchronizer {
    store: Arc<VersionedStore>,
    deprecator: ArchiveDeprecator,
    interval: Duration,
    push_enabled: bool,
    phase: watch::Sender<SyncPhase>,
}

impl Synchronizer {
    pub fn new(store: Arc<VersionedStore>, interval: Duration, max_age: Duration) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            deprecator: ArchiveDeprecator::new(store.clone(), max_age),
            store,
            interval,
            push_enabled: true,
            phase,
        }
    }

    /// Skip the push step, for archives without a remote
    pub fn local_only(mut self) -> Self {
        self.push_enabled = false;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Follow phase changes
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }

    /// Run one sweep + push cycle
    pub async fn tick(&self) -> TickReport {
        let started = std::time::Instant::now();
        log_op_start!(OP_SYNC_TICK);
        let mut report = TickReport::default();

        self.enter(SyncPhase::Sweeping);
        match self.deprecator.sweep().await {
            Ok(sweep) => report.sweep = Some(sweep),
            Err(err) => tracing::warn!(
                err.code = err.code(),
                error = %err,
                "Sweep failed; pushing anyway"
            ),
        }

        if self.push_enabled {
            self.enter(SyncPhase::Pushing);
            match self.store.push().await {
                Ok(SyncOutcome::UpToDate) => {
                    tracing::debug!("Remote already up to date");
                    report.push = Some(SyncOutcome::UpToDate);
                }
                Ok(SyncOutcome::Transferred) => {
                    tracing::info!("Pushed archive revisions");
                    report.push = Some(SyncOutcome::Transferred);
                }
                Err(err) => tracing::warn!(
                    err.code = err.code(),
                    error = %err,
                    "Push failed; retrying next tick"
                ),
            }
        }

        self.enter(SyncPhase::Idle);
        log_op_end!(
            OP_SYNC_TICK,
            duration_ms = started.elapsed().as_millis() as u64,
            swept = report.sweep.is_some(),
            pushed = report.push.is_some(),
        );
        report
    }

    /// Tick every `interval` until `cancel` fires
    ///
    /// The first tick happens one interval after the call.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.deprecator.max_age().as_secs(),
            push = self.push_enabled,
            "Synchronizer started"
        );
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        tracing::info!("Synchronizer stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
