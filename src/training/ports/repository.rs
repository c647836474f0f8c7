//! Repository port for training job records.

use crate::project::ProjectId;
use crate::training::domain::{RemoteJobId, TrainingJob, TrainingJobId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for training job repository operations.
pub type TrainingJobRepositoryResult<T> = Result<T, TrainingJobRepositoryError>;

/// Training job persistence contract with optimistic updates.
#[async_trait]
pub trait TrainingJobRepository: Send + Sync {
    /// Inserts a new job.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingJobRepositoryError::DuplicateJob`] or
    /// [`TrainingJobRepositoryError::DuplicateRemoteJob`] on uniqueness
    /// violations.
    async fn insert(&self, job: &TrainingJob) -> TrainingJobRepositoryResult<()>;

    /// Finds a job by local identifier.
    async fn find_by_id(&self, id: TrainingJobId)
    -> TrainingJobRepositoryResult<Option<TrainingJob>>;

    /// Finds the newest job carrying a host-assigned identifier.
    async fn find_by_remote_id(
        &self,
        remote_job_id: &RemoteJobId,
    ) -> TrainingJobRepositoryResult<Option<TrainingJob>>;

    /// Lists every job still in the `training` status, oldest first.
    async fn list_active(&self) -> TrainingJobRepositoryResult<Vec<TrainingJob>>;

    /// Lists a project's jobs, newest first.
    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> TrainingJobRepositoryResult<Vec<TrainingJob>>;

    /// Replaces a job's mutable state if its stored `updated_at` still equals
    /// `expected_updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingJobRepositoryError::Conflict`] when the record has
    /// changed since it was read and [`TrainingJobRepositoryError::NotFound`]
    /// when it no longer exists.
    async fn update(
        &self,
        job: &TrainingJob,
        expected_updated_at: DateTime<Utc>,
    ) -> TrainingJobRepositoryResult<()>;

    /// Removes a job; returns whether a record was removed.
    async fn delete(&self, id: TrainingJobId) -> TrainingJobRepositoryResult<bool>;
}

/// Errors returned by training job repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TrainingJobRepositoryError {
    /// A job with the same identifier already exists.
    #[error("duplicate training job identifier: {0}")]
    DuplicateJob(TrainingJobId),

    /// The host-assigned identifier is already recorded for this host.
    #[error("duplicate remote job identifier: {0}")]
    DuplicateRemoteJob(RemoteJobId),

    /// The job changed since it was read.
    #[error("training job {0} was modified concurrently")]
    Conflict(TrainingJobId),

    /// The job does not exist.
    #[error("training job not found: {0}")]
    NotFound(TrainingJobId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TrainingJobRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
