//! Service layer coordinating backups, the training host, the job registry,
//! and artifact capture.

use crate::artifact::domain::ModelArtifact;
use crate::config::ConfigError;
use crate::project::ProjectId;
use crate::training::{
    domain::{
        HostUrl, NewTrainingJob, RemoteJobId, TrainingDomainError, TrainingJob, TrainingJobId,
        TrainingOptions, TrainingStatus,
    },
    ports::{
        ArtifactCapture, CollaboratorError, ModelReadyNotifier, PreTrainingSnapshot, TrainingHost,
        TrainingHostError, TrainingJobRepository, TrainingJobRepositoryError,
        TrainingPayloadSource, TrainingSubmission,
    },
};
use dashmap::DashSet;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const SNAPSHOT_COMMENT: &str = "pre-training snapshot";

/// Service-level errors for training operations.
#[derive(Debug, Error)]
pub enum TrainingServiceError {
    /// Operator configuration is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A job rejected a state change.
    #[error(transparent)]
    Domain(#[from] TrainingDomainError),

    /// The training host failed or rejected a call.
    #[error(transparent)]
    Host(#[from] TrainingHostError),

    /// Job registry operation failed.
    #[error(transparent)]
    Repository(#[from] TrainingJobRepositoryError),

    /// Backup, payload, or artifact collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Result type for training service operations.
pub type TrainingServiceResult<T> = Result<T, TrainingServiceError>;

/// Result of reconciling one job against the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No job with the identifier exists.
    NotFound,
    /// Another reconcile for the same job is still running.
    InFlight,
    /// The job was already terminal; nothing was fetched.
    AlreadyTerminal(TrainingStatus),
    /// The host reported the state already on record.
    Unchanged,
    /// New status and logs were committed.
    Updated(TrainingStatus),
    /// A concurrent writer changed the job first; this pass was discarded.
    Superseded,
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The host stopped the job and the record is now `cancelled`.
    Cancelled,
    /// No job carries the remote identifier.
    NotFound,
    /// The host declined to cancel; the record is untouched.
    Rejected,
    /// The job had already reached a terminal status.
    AlreadyFinished(TrainingStatus),
}

/// Collaborators supplied by sibling contexts and the embedding
/// application.
#[derive(Clone)]
pub struct TrainingCollaborators {
    /// Takes the pre-training backup.
    pub snapshots: Arc<dyn PreTrainingSnapshot>,
    /// Builds the training data.
    pub payloads: Arc<dyn TrainingPayloadSource>,
    /// Stores training results.
    pub artifacts: Arc<dyn ArtifactCapture>,
    /// Announces captured models.
    pub notifier: Arc<dyn ModelReadyNotifier>,
}

/// Removes a job from the in-flight set when the reconcile pass ends, on
/// every exit path.
struct InFlightGuard {
    jobs: Arc<DashSet<TrainingJobId>>,
    job_id: TrainingJobId,
}

impl InFlightGuard {
    fn acquire(jobs: &Arc<DashSet<TrainingJobId>>, job_id: TrainingJobId) -> Option<Self> {
        jobs.insert(job_id).then(|| Self {
            jobs: Arc::clone(jobs),
            job_id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.jobs.remove(&self.job_id);
    }
}

/// Drives training jobs from submission to captured artifact.
#[derive(Clone)]
pub struct TrainingOrchestrator<R, H, C>
where
    R: TrainingJobRepository,
    H: TrainingHost,
    C: Clock + Send + Sync,
{
    jobs: Arc<R>,
    host: Arc<H>,
    collaborators: TrainingCollaborators,
    clock: Arc<C>,
    default_image: Option<String>,
    in_flight: Arc<DashSet<TrainingJobId>>,
}

impl<R, H, C> TrainingOrchestrator<R, H, C>
where
    R: TrainingJobRepository,
    H: TrainingHost,
    C: Clock + Send + Sync,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(
        jobs: Arc<R>,
        host: Arc<H>,
        collaborators: TrainingCollaborators,
        clock: Arc<C>,
    ) -> Self {
        Self {
            jobs,
            host,
            collaborators,
            clock,
            default_image: None,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Sets the container image used when a submission names none.
    #[must_use]
    pub fn with_default_image(mut self, image: Option<String>) -> Self {
        self.default_image = image;
        self
    }

    /// Snapshots the project, submits it to `host`, and records the job.
    ///
    /// Steps run strictly in order: option resolution, backup, payload,
    /// remote submission, local insert. When the insert fails the remote job
    /// is cancelled before the insert error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Config`] when no image is available
    /// (before anything else happens), [`TrainingServiceError::Collaborator`]
    /// when the backup or payload fails, [`TrainingServiceError::Host`] when
    /// the host rejects the submission, and
    /// [`TrainingServiceError::Repository`] when the job cannot be recorded.
    pub async fn submit(
        &self,
        project_id: &ProjectId,
        host: &HostUrl,
        options: &TrainingOptions,
    ) -> TrainingServiceResult<TrainingJob> {
        let resolved = options.resolve(self.default_image.as_deref())?;
        let backup_id = self
            .collaborators
            .snapshots
            .snapshot(project_id, Some(SNAPSHOT_COMMENT.to_owned()))
            .await?;
        let payload = self
            .collaborators
            .payloads
            .training_payload(project_id, &resolved)
            .await?;
        let remote_job_id = self
            .host
            .train(
                host,
                TrainingSubmission {
                    project_id: project_id.clone(),
                    image: Some(resolved.image),
                    extra_args: resolved.extra_args,
                    node: resolved.node,
                    payload,
                },
            )
            .await?;

        let job = TrainingJob::new(
            NewTrainingJob {
                remote_job_id,
                project_id: project_id.clone(),
                host: host.clone(),
                name: resolved.name,
                backup_id,
            },
            &*self.clock,
        );
        if let Err(err) = self.jobs.insert(&job).await {
            error!(
                project_id = %project_id,
                host = %host,
                remote_job_id = %job.remote_job_id(),
                error = %err,
                "failed to record submitted training job, cancelling remote job"
            );
            self.cancel_orphan(host, job.remote_job_id()).await;
            return Err(err.into());
        }

        info!(
            project_id = %project_id,
            host = %host,
            job_id = %job.id(),
            remote_job_id = %job.remote_job_id(),
            backup_id = %backup_id,
            "training job submitted"
        );
        Ok(job)
    }

    /// Refreshes one job from the host.
    ///
    /// Terminal jobs are left alone. When the host reports success the
    /// result is captured before the status is committed, so a failed
    /// capture leaves the job `training` and retryable.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Host`] when the host cannot be read,
    /// [`TrainingServiceError::Collaborator`] when capture fails, and
    /// [`TrainingServiceError::Repository`] for registry failures other than
    /// a lost update race.
    pub async fn reconcile(&self, job_id: TrainingJobId) -> TrainingServiceResult<ReconcileOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, job_id) else {
            debug!(job_id = %job_id, "reconcile already in flight");
            return Ok(ReconcileOutcome::InFlight);
        };
        let Some(mut job) = self.jobs.find_by_id(job_id).await? else {
            return Ok(ReconcileOutcome::NotFound);
        };
        if job.status().is_terminal() {
            return Ok(ReconcileOutcome::AlreadyTerminal(job.status()));
        }

        let status = self.host.status(job.host(), job.remote_job_id()).await?;
        let logs = self.host.logs(job.host(), job.remote_job_id()).await?;
        let expected = job.updated_at();
        if !job.record_progress(status, logs, &*self.clock)? {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let captured = if status == TrainingStatus::Success {
            Some(self.capture_result(&job).await?)
        } else {
            None
        };

        match self.jobs.update(&job, expected).await {
            Ok(()) => {}
            Err(TrainingJobRepositoryError::Conflict(_)) => {
                info!(
                    job_id = %job_id,
                    remote_job_id = %job.remote_job_id(),
                    "reconcile superseded by a concurrent update"
                );
                return Ok(ReconcileOutcome::Superseded);
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            job_id = %job_id,
            remote_job_id = %job.remote_job_id(),
            status = %status,
            "training job reconciled"
        );
        if let Some(artifact) = captured {
            self.notify(job.project_id(), &artifact).await;
        }
        Ok(ReconcileOutcome::Updated(status))
    }

    /// Cancels the job carrying `remote_job_id`.
    ///
    /// The record becomes `cancelled` only after the host acknowledges. A
    /// lost update race re-reads the job once: if it became terminal the
    /// cancel reports [`CancelOutcome::AlreadyFinished`], otherwise the
    /// cancel is applied once more.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Host`] when the host call fails and
    /// [`TrainingServiceError::Repository`] on registry failure, including a
    /// second consecutive conflict.
    pub async fn cancel(&self, remote_job_id: &RemoteJobId) -> TrainingServiceResult<CancelOutcome> {
        let Some(job) = self.jobs.find_by_remote_id(remote_job_id).await? else {
            return Ok(CancelOutcome::NotFound);
        };
        if job.status().is_terminal() {
            return Ok(CancelOutcome::AlreadyFinished(job.status()));
        }
        if !self.host.cancel(job.host(), remote_job_id).await? {
            warn!(
                job_id = %job.id(),
                remote_job_id = %remote_job_id,
                host = %job.host(),
                "training host declined cancellation"
            );
            return Ok(CancelOutcome::Rejected);
        }
        self.commit_cancel(job).await
    }

    /// Removes the job carrying `remote_job_id`, after a best-effort remote
    /// cancel.
    ///
    /// Returns `false` when no such job exists.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the record cannot be
    /// read or removed. Remote cancel failures are logged and ignored.
    pub async fn delete(&self, remote_job_id: &RemoteJobId) -> TrainingServiceResult<bool> {
        let Some(job) = self.jobs.find_by_remote_id(remote_job_id).await? else {
            return Ok(false);
        };
        match self.host.cancel(job.host(), remote_job_id).await {
            Ok(accepted) => debug!(remote_job_id = %remote_job_id, accepted, "remote cancel before delete"),
            Err(err) => debug!(
                remote_job_id = %remote_job_id,
                error = %err,
                "remote cancel before delete failed"
            ),
        }
        let removed = self.jobs.delete(job.id()).await?;
        info!(job_id = %job.id(), remote_job_id = %remote_job_id, "training job deleted");
        Ok(removed)
    }

    /// Returns the recorded status of a job, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the lookup fails.
    pub async fn status(
        &self,
        remote_job_id: &RemoteJobId,
    ) -> TrainingServiceResult<Option<TrainingStatus>> {
        Ok(self
            .jobs
            .find_by_remote_id(remote_job_id)
            .await?
            .map(|job| job.status()))
    }

    /// Returns the most recently fetched logs of a job, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the lookup fails.
    pub async fn logs(&self, remote_job_id: &RemoteJobId) -> TrainingServiceResult<Option<String>> {
        Ok(self
            .jobs
            .find_by_remote_id(remote_job_id)
            .await?
            .map(|job| job.logs().to_owned()))
    }

    /// Finds a job by local identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the lookup fails.
    pub async fn find_job(&self, job_id: TrainingJobId) -> TrainingServiceResult<Option<TrainingJob>> {
        Ok(self.jobs.find_by_id(job_id).await?)
    }

    /// Finds a job by host-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the lookup fails.
    pub async fn find_job_by_remote(
        &self,
        remote_job_id: &RemoteJobId,
    ) -> TrainingServiceResult<Option<TrainingJob>> {
        Ok(self.jobs.find_by_remote_id(remote_job_id).await?)
    }

    /// Lists a project's jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the lookup fails.
    pub async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> TrainingServiceResult<Vec<TrainingJob>> {
        Ok(self.jobs.list_for_project(project_id).await?)
    }

    /// Lists every job still training, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingServiceError::Repository`] when the lookup fails.
    pub async fn list_active(&self) -> TrainingServiceResult<Vec<TrainingJob>> {
        Ok(self.jobs.list_active().await?)
    }

    /// Reports whether `host` answers.
    pub async fn ping(&self, host: &HostUrl) -> bool {
        self.host.ping(host).await
    }

    async fn cancel_orphan(&self, host: &HostUrl, remote_job_id: &RemoteJobId) {
        match self.host.cancel(host, remote_job_id).await {
            Ok(true) => info!(host = %host, remote_job_id = %remote_job_id, "orphaned remote job cancelled"),
            Ok(false) => warn!(
                host = %host,
                remote_job_id = %remote_job_id,
                "training host declined to cancel orphaned job"
            ),
            Err(err) => error!(
                host = %host,
                remote_job_id = %remote_job_id,
                error = %err,
                "failed to cancel orphaned remote job"
            ),
        }
    }

    async fn capture_result(&self, job: &TrainingJob) -> TrainingServiceResult<ModelArtifact> {
        let stream = self.host.result(job.host(), job.remote_job_id()).await?;
        let artifact = self
            .collaborators
            .artifacts
            .capture(job.project_id(), stream, job.name().map(ToOwned::to_owned))
            .await?;
        Ok(artifact)
    }

    async fn commit_cancel(&self, job: TrainingJob) -> TrainingServiceResult<CancelOutcome> {
        let mut current = job;
        let mut retried = false;
        loop {
            let expected = current.updated_at();
            current.mark_cancelled(&*self.clock)?;
            match self.jobs.update(&current, expected).await {
                Ok(()) => {
                    info!(
                        job_id = %current.id(),
                        remote_job_id = %current.remote_job_id(),
                        "training job cancelled"
                    );
                    return Ok(CancelOutcome::Cancelled);
                }
                Err(TrainingJobRepositoryError::Conflict(job_id)) if !retried => {
                    retried = true;
                    debug!(job_id = %job_id, "cancel lost an update race, re-reading");
                    match self.jobs.find_by_id(job_id).await? {
                        None => return Ok(CancelOutcome::NotFound),
                        Some(fresh) if fresh.status().is_terminal() => {
                            return Ok(CancelOutcome::AlreadyFinished(fresh.status()));
                        }
                        Some(fresh) => current = fresh,
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn notify(&self, project_id: &ProjectId, artifact: &ModelArtifact) {
        if let Err(err) = self
            .collaborators
            .notifier
            .notify_model_ready(project_id, artifact)
            .await
        {
            warn!(
                project_id = %project_id,
                artifact_id = %artifact.id(),
                error = %err,
                "model-ready notification failed"
            );
        }
    }
}
