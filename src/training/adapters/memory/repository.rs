//! In-memory training job repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::project::ProjectId;
use crate::training::{
    domain::{RemoteJobId, TrainingJob, TrainingJobId},
    ports::{TrainingJobRepository, TrainingJobRepositoryError, TrainingJobRepositoryResult},
};

/// Thread-safe in-memory training job repository.
///
/// Conditional updates compare `updated_at` under the write lock, matching
/// the `UPDATE ... WHERE updated_at = $expected` semantics of the
/// `PostgreSQL` adapter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrainingJobRepository {
    state: Arc<RwLock<InMemoryJobState>>,
}

#[derive(Debug, Default)]
struct InMemoryJobState {
    jobs: HashMap<TrainingJobId, TrainingJob>,
    fail_updates: bool,
}

impl InMemoryTrainingJobRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent updates fail with a persistence error, simulating a
    /// store outage or a crash before commit.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingJobRepositoryError::Persistence`] when the state
    /// lock is poisoned.
    pub fn fail_updates(&self, fail: bool) -> TrainingJobRepositoryResult<()> {
        self.write()?.fail_updates = fail;
        Ok(())
    }

    fn read(&self) -> TrainingJobRepositoryResult<RwLockReadGuard<'_, InMemoryJobState>> {
        self.state.read().map_err(|err| {
            TrainingJobRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TrainingJobRepositoryResult<RwLockWriteGuard<'_, InMemoryJobState>> {
        self.state.write().map_err(|err| {
            TrainingJobRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl TrainingJobRepository for InMemoryTrainingJobRepository {
    async fn insert(&self, job: &TrainingJob) -> TrainingJobRepositoryResult<()> {
        let mut state = self.write()?;
        if state.jobs.contains_key(&job.id()) {
            return Err(TrainingJobRepositoryError::DuplicateJob(job.id()));
        }
        let remote_taken = state.jobs.values().any(|existing| {
            existing.host() == job.host() && existing.remote_job_id() == job.remote_job_id()
        });
        if remote_taken {
            return Err(TrainingJobRepositoryError::DuplicateRemoteJob(
                job.remote_job_id().clone(),
            ));
        }
        state.jobs.insert(job.id(), job.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: TrainingJobId,
    ) -> TrainingJobRepositoryResult<Option<TrainingJob>> {
        Ok(self.read()?.jobs.get(&id).cloned())
    }

    async fn find_by_remote_id(
        &self,
        remote_job_id: &RemoteJobId,
    ) -> TrainingJobRepositoryResult<Option<TrainingJob>> {
        let state = self.read()?;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.remote_job_id() == remote_job_id)
            .max_by_key(|job| job.created_at())
            .cloned())
    }

    async fn list_active(&self) -> TrainingJobRepositoryResult<Vec<TrainingJob>> {
        let state = self.read()?;
        let mut jobs: Vec<TrainingJob> = state
            .jobs
            .values()
            .filter(|job| !job.status().is_terminal())
            .cloned()
            .collect();
        jobs.sort_by_key(TrainingJob::created_at);
        Ok(jobs)
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> TrainingJobRepositoryResult<Vec<TrainingJob>> {
        let state = self.read()?;
        let mut jobs: Vec<TrainingJob> = state
            .jobs
            .values()
            .filter(|job| job.project_id() == project_id)
            .cloned()
            .collect();
        jobs.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(jobs)
    }

    async fn update(
        &self,
        job: &TrainingJob,
        expected_updated_at: DateTime<Utc>,
    ) -> TrainingJobRepositoryResult<()> {
        let mut state = self.write()?;
        if state.fail_updates {
            return Err(TrainingJobRepositoryError::persistence(std::io::Error::other(
                "training job store unavailable",
            )));
        }
        let stored = state
            .jobs
            .get_mut(&job.id())
            .ok_or(TrainingJobRepositoryError::NotFound(job.id()))?;
        if stored.updated_at() != expected_updated_at {
            return Err(TrainingJobRepositoryError::Conflict(job.id()));
        }
        *stored = job.clone();
        Ok(())
    }

    async fn delete(&self, id: TrainingJobId) -> TrainingJobRepositoryResult<bool> {
        Ok(self.write()?.jobs.remove(&id).is_some())
    }
}
