//! `PostgreSQL` repository implementation for training jobs.

use super::{
    models::{NewTrainingJobRow, TrainingJobRow},
    schema::training_jobs,
};
use crate::backup::domain::BackupId;
use crate::postgres::PgPool;
use crate::project::ProjectId;
use crate::training::{
    domain::{
        HostUrl, PersistedTrainingJobData, RemoteJobId, TrainingJob, TrainingJobId,
        TrainingStatus,
    },
    ports::{TrainingJobRepository, TrainingJobRepositoryError, TrainingJobRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

const REMOTE_UNIQUE_CONSTRAINT: &str = "training_jobs_remote_unique";

/// `PostgreSQL`-backed training job repository.
///
/// Updates are conditional on the stored `updated_at`, so two writers racing
/// on the same job cannot both commit.
#[derive(Debug, Clone)]
pub struct PostgresTrainingJobRepository {
    pool: PgPool,
}

impl PostgresTrainingJobRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TrainingJobRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TrainingJobRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(TrainingJobRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TrainingJobRepositoryError::persistence)?
    }
}

#[async_trait]
impl TrainingJobRepository for PostgresTrainingJobRepository {
    async fn insert(&self, job: &TrainingJob) -> TrainingJobRepositoryResult<()> {
        let job_id = job.id();
        let remote_job_id = job.remote_job_id().clone();
        let new_row = to_new_row(job);
        self.run_blocking(move |connection| {
            diesel::insert_into(training_jobs::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
                        if info.constraint_name() == Some(REMOTE_UNIQUE_CONSTRAINT) =>
                    {
                        TrainingJobRepositoryError::DuplicateRemoteJob(remote_job_id)
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TrainingJobRepositoryError::DuplicateJob(job_id)
                    }
                    _ => TrainingJobRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: TrainingJobId,
    ) -> TrainingJobRepositoryResult<Option<TrainingJob>> {
        self.run_blocking(move |connection| {
            let row = training_jobs::table
                .find(id.into_inner())
                .select(TrainingJobRow::as_select())
                .first::<TrainingJobRow>(connection)
                .optional()
                .map_err(TrainingJobRepositoryError::persistence)?;
            row.map(row_to_job).transpose()
        })
        .await
    }

    async fn find_by_remote_id(
        &self,
        remote_job_id: &RemoteJobId,
    ) -> TrainingJobRepositoryResult<Option<TrainingJob>> {
        let remote = remote_job_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = training_jobs::table
                .filter(training_jobs::remote_job_id.eq(remote))
                .order(training_jobs::created_at.desc())
                .select(TrainingJobRow::as_select())
                .first::<TrainingJobRow>(connection)
                .optional()
                .map_err(TrainingJobRepositoryError::persistence)?;
            row.map(row_to_job).transpose()
        })
        .await
    }

    async fn list_active(&self) -> TrainingJobRepositoryResult<Vec<TrainingJob>> {
        self.run_blocking(move |connection| {
            training_jobs::table
                .filter(training_jobs::status.eq(TrainingStatus::Training.as_str()))
                .order(training_jobs::created_at.asc())
                .select(TrainingJobRow::as_select())
                .load::<TrainingJobRow>(connection)
                .map_err(TrainingJobRepositoryError::persistence)?
                .into_iter()
                .map(row_to_job)
                .collect()
        })
        .await
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> TrainingJobRepositoryResult<Vec<TrainingJob>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            training_jobs::table
                .filter(training_jobs::project_id.eq(project))
                .order(training_jobs::created_at.desc())
                .select(TrainingJobRow::as_select())
                .load::<TrainingJobRow>(connection)
                .map_err(TrainingJobRepositoryError::persistence)?
                .into_iter()
                .map(row_to_job)
                .collect()
        })
        .await
    }

    async fn update(
        &self,
        job: &TrainingJob,
        expected_updated_at: DateTime<Utc>,
    ) -> TrainingJobRepositoryResult<()> {
        let job_id = job.id();
        let status = job.status().as_str();
        let logs = job.logs().to_owned();
        let updated_at = job.updated_at();
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                training_jobs::table
                    .filter(training_jobs::id.eq(job_id.into_inner()))
                    .filter(training_jobs::updated_at.eq(expected_updated_at)),
            )
            .set((
                training_jobs::status.eq(status),
                training_jobs::logs.eq(logs),
                training_jobs::updated_at.eq(updated_at),
            ))
            .execute(connection)
            .map_err(TrainingJobRepositoryError::persistence)?;
            if updated == 1 {
                return Ok(());
            }

            let exists = diesel::select(diesel::dsl::exists(
                training_jobs::table.find(job_id.into_inner()),
            ))
            .get_result::<bool>(connection)
            .map_err(TrainingJobRepositoryError::persistence)?;
            if exists {
                Err(TrainingJobRepositoryError::Conflict(job_id))
            } else {
                Err(TrainingJobRepositoryError::NotFound(job_id))
            }
        })
        .await
    }

    async fn delete(&self, id: TrainingJobId) -> TrainingJobRepositoryResult<bool> {
        self.run_blocking(move |connection| {
            let removed = diesel::delete(training_jobs::table.find(id.into_inner()))
                .execute(connection)
                .map_err(TrainingJobRepositoryError::persistence)?;
            Ok(removed > 0)
        })
        .await
    }
}

fn to_new_row(job: &TrainingJob) -> NewTrainingJobRow {
    NewTrainingJobRow {
        id: job.id().into_inner(),
        remote_job_id: job.remote_job_id().as_str().to_owned(),
        project_id: job.project_id().as_str().to_owned(),
        host: job.host().as_str().to_owned(),
        name: job.name().map(ToOwned::to_owned),
        backup_id: job.backup_id().into_inner(),
        status: job.status().as_str().to_owned(),
        logs: job.logs().to_owned(),
        created_at: job.created_at(),
        updated_at: job.updated_at(),
    }
}

fn row_to_job(row: TrainingJobRow) -> TrainingJobRepositoryResult<TrainingJob> {
    let remote_job_id =
        RemoteJobId::new(row.remote_job_id).map_err(TrainingJobRepositoryError::persistence)?;
    let project_id =
        ProjectId::new(row.project_id).map_err(TrainingJobRepositoryError::persistence)?;
    let host = HostUrl::new(row.host).map_err(TrainingJobRepositoryError::persistence)?;
    let status = TrainingStatus::try_from(row.status.as_str())
        .map_err(TrainingJobRepositoryError::persistence)?;
    Ok(TrainingJob::from_persisted(PersistedTrainingJobData {
        id: TrainingJobId::from_uuid(row.id),
        remote_job_id,
        project_id,
        host,
        name: row.name,
        backup_id: BackupId::from_uuid(row.backup_id),
        status,
        logs: row.logs,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}
