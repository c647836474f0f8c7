//! Periodic reconciliation of active training jobs.
//!
//! The poller only schedules; the reconcile algorithm lives in
//! [`TrainingOrchestrator::reconcile`].

use super::orchestrator::{ReconcileOutcome, TrainingOrchestrator, TrainingServiceResult};
use crate::config::PollerSettings;
use crate::training::ports::{TrainingHost, TrainingJobRepository};
use futures::{StreamExt, stream};
use mockable::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counts from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Active jobs found at the start of the pass.
    pub examined: usize,
    /// Jobs whose status or logs were committed.
    pub updated: usize,
    /// Jobs whose reconcile returned an error.
    pub failed: usize,
}

/// Runs reconcile passes over every active job on a fixed cadence.
pub struct TrainingPoller<R, H, C>
where
    R: TrainingJobRepository,
    H: TrainingHost,
    C: Clock + Send + Sync,
{
    orchestrator: Arc<TrainingOrchestrator<R, H, C>>,
    settings: PollerSettings,
}

impl<R, H, C> TrainingPoller<R, H, C>
where
    R: TrainingJobRepository,
    H: TrainingHost,
    C: Clock + Send + Sync,
{
    /// Creates a poller.
    #[must_use]
    pub const fn new(orchestrator: Arc<TrainingOrchestrator<R, H, C>>, settings: PollerSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Reconciles every active job once, at most `concurrency` at a time.
    ///
    /// Individual job failures are logged and counted; they leave the job
    /// `training` for the next pass.
    ///
    /// # Errors
    ///
    /// Returns an error only when the active jobs cannot be listed.
    pub async fn poll_once(&self) -> TrainingServiceResult<PollReport> {
        let active = self.orchestrator.list_active().await?;
        let examined = active.len();
        let updated = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        stream::iter(active)
            .for_each_concurrent(self.settings.concurrency.get(), |job| {
                let updated_count = &updated;
                let failed_count = &failed;
                async move {
                    match self.orchestrator.reconcile(job.id()).await {
                        Ok(ReconcileOutcome::Updated(status)) => {
                            debug!(job_id = %job.id(), status = %status, "poll updated job");
                            updated_count.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(outcome) => {
                            debug!(job_id = %job.id(), ?outcome, "poll left job unchanged");
                        }
                        Err(err) => {
                            warn!(
                                job_id = %job.id(),
                                remote_job_id = %job.remote_job_id(),
                                host = %job.host(),
                                error = %err,
                                "reconcile failed, will retry next pass"
                            );
                            failed_count.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .await;

        Ok(PollReport {
            examined,
            updated: updated.into_inner(),
            failed: failed.into_inner(),
        })
    }

    /// Runs passes every configured interval until `shutdown` flips to
    /// `true` or its sender is dropped.
    ///
    /// Shutdown is observed while a pass is running too; the pass is then
    /// abandoned and its jobs stay `training` for the next start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.settings.interval.as_secs(),
            concurrency = self.settings.concurrency.get(),
            "training poller started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if stop_requested(changed.is_err(), &shutdown) {
                        break;
                    }
                    continue;
                }
            }
            tokio::select! {
                outcome = self.poll_once() => match outcome {
                    Ok(report) if report.examined > 0 => debug!(?report, "poll pass complete"),
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "poll pass failed to list active jobs"),
                },
                changed = shutdown.changed() => {
                    if stop_requested(changed.is_err(), &shutdown) {
                        warn!("shutdown requested during a poll pass, abandoning it");
                        break;
                    }
                }
            }
        }
        info!("training poller stopped");
    }
}

fn stop_requested(sender_dropped: bool, shutdown: &watch::Receiver<bool>) -> bool {
    sender_dropped || *shutdown.borrow()
}
