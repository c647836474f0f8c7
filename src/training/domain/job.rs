//! Training job aggregate.

use super::{HostUrl, RemoteJobId, TrainingDomainError, TrainingJobId, TrainingStatus};
use crate::backup::domain::BackupId;
use crate::project::ProjectId;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Local record of one remote training invocation.
///
/// `updated_at` doubles as the optimistic-concurrency version token: every
/// mutation moves it strictly forward at microsecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJob {
    id: TrainingJobId,
    remote_job_id: RemoteJobId,
    project_id: ProjectId,
    host: HostUrl,
    name: Option<String>,
    backup_id: BackupId,
    status: TrainingStatus,
    logs: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for a freshly submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrainingJob {
    /// Identifier assigned by the host.
    pub remote_job_id: RemoteJobId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Host the job runs on.
    pub host: HostUrl,
    /// Optional display name.
    pub name: Option<String>,
    /// Snapshot taken before submission.
    pub backup_id: BackupId,
}

/// Parameter object for reconstructing a persisted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTrainingJobData {
    /// Persisted job identifier.
    pub id: TrainingJobId,
    /// Identifier assigned by the host.
    pub remote_job_id: RemoteJobId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Host the job runs on.
    pub host: HostUrl,
    /// Optional display name.
    pub name: Option<String>,
    /// Snapshot taken before submission.
    pub backup_id: BackupId,
    /// Persisted status.
    pub status: TrainingStatus,
    /// Last fetched logs.
    pub logs: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TrainingJob {
    /// Creates a job in the `training` status.
    #[must_use]
    pub fn new(data: NewTrainingJob, clock: &impl Clock) -> Self {
        let now = clock.utc().trunc_subsecs(6);
        Self {
            id: TrainingJobId::new(),
            remote_job_id: data.remote_job_id,
            project_id: data.project_id,
            host: data.host,
            name: data.name,
            backup_id: data.backup_id,
            status: TrainingStatus::Training,
            logs: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a job from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTrainingJobData) -> Self {
        Self {
            id: data.id,
            remote_job_id: data.remote_job_id,
            project_id: data.project_id,
            host: data.host,
            name: data.name,
            backup_id: data.backup_id,
            status: data.status,
            logs: data.logs,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Applies a status and log snapshot fetched from the host.
    ///
    /// Returns `Ok(false)` when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingDomainError::InvalidStatusTransition`] when the job
    /// is terminal and the snapshot differs from the stored state.
    pub fn record_progress(
        &mut self,
        status: TrainingStatus,
        logs: String,
        clock: &impl Clock,
    ) -> Result<bool, TrainingDomainError> {
        if status == self.status && logs == self.logs {
            return Ok(false);
        }
        if self.status.is_terminal() {
            return Err(self.invalid_transition(status));
        }
        self.status = status;
        self.logs = logs;
        self.touch(clock);
        Ok(true)
    }

    /// Moves a running job to `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingDomainError::InvalidStatusTransition`] when the job
    /// is already terminal.
    pub fn mark_cancelled(&mut self, clock: &impl Clock) -> Result<(), TrainingDomainError> {
        if !self.status.can_transition_to(TrainingStatus::Cancelled) {
            return Err(self.invalid_transition(TrainingStatus::Cancelled));
        }
        self.status = TrainingStatus::Cancelled;
        self.touch(clock);
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        let now = clock.utc().trunc_subsecs(6);
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    const fn invalid_transition(&self, to: TrainingStatus) -> TrainingDomainError {
        TrainingDomainError::InvalidStatusTransition {
            job_id: self.id,
            from: self.status,
            to,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> TrainingJobId {
        self.id
    }

    /// Returns the host-assigned identifier.
    #[must_use]
    pub const fn remote_job_id(&self) -> &RemoteJobId {
        &self.remote_job_id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the host the job runs on.
    #[must_use]
    pub const fn host(&self) -> &HostUrl {
        &self.host
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the pre-training snapshot.
    #[must_use]
    pub const fn backup_id(&self) -> BackupId {
        self.backup_id
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TrainingStatus {
        self.status
    }

    /// Returns the last fetched logs.
    #[must_use]
    pub fn logs(&self) -> &str {
        &self.logs
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp, used as the version token.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
