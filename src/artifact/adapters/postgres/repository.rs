//! `PostgreSQL` repository implementation for model artifacts.

use super::{
    models::{ArtifactRow, NewArtifactRow},
    schema::model_artifacts,
};
use crate::artifact::{
    domain::{ArtifactFile, ArtifactId, ModelArtifact, PersistedModelArtifactData},
    ports::{ArtifactRepository, ArtifactRepositoryError, ArtifactRepositoryResult},
};
use crate::postgres::PgPool;
use crate::project::ProjectId;
use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed artifact repository.
///
/// The partial unique index `idx_model_artifacts_one_deployed` backs the
/// one-deployed-artifact rule.
#[derive(Debug, Clone)]
pub struct PostgresArtifactRepository {
    pool: PgPool,
}

impl PostgresArtifactRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ArtifactRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ArtifactRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ArtifactRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ArtifactRepositoryError::persistence)?
    }
}

#[async_trait]
impl ArtifactRepository for PostgresArtifactRepository {
    async fn store(&self, artifact: &ModelArtifact) -> ArtifactRepositoryResult<()> {
        let artifact_id = artifact.id();
        let new_row = to_new_row(artifact)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(model_artifacts::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ArtifactRepositoryError::DuplicateArtifact(artifact_id)
                    }
                    _ => ArtifactRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = model_artifacts::table
                .filter(model_artifacts::id.eq(id.into_inner()))
                .filter(model_artifacts::project_id.eq(project))
                .select(ArtifactRow::as_select())
                .first::<ArtifactRow>(connection)
                .optional()
                .map_err(ArtifactRepositoryError::persistence)?;
            row.map(row_to_artifact).transpose()
        })
        .await
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactRepositoryResult<Vec<ModelArtifact>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            model_artifacts::table
                .filter(model_artifacts::project_id.eq(project))
                .order(model_artifacts::created_at.desc())
                .select(ArtifactRow::as_select())
                .load::<ArtifactRow>(connection)
                .map_err(ArtifactRepositoryError::persistence)?
                .into_iter()
                .map(row_to_artifact)
                .collect()
        })
        .await
    }

    async fn find_deployed(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = model_artifacts::table
                .filter(model_artifacts::project_id.eq(project))
                .filter(model_artifacts::deployed.eq(true))
                .select(ArtifactRow::as_select())
                .first::<ArtifactRow>(connection)
                .optional()
                .map_err(ArtifactRepositoryError::persistence)?;
            row.map(row_to_artifact).transpose()
        })
        .await
    }

    async fn set_deployed(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
        deployed_by: Option<String>,
        at: DateTime<Utc>,
    ) -> ArtifactRepositoryResult<ModelArtifact> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = connection
                .transaction::<ArtifactRow, DieselError, _>(|tx| {
                    // Lock the target row so concurrent deploys serialise here.
                    model_artifacts::table
                        .filter(model_artifacts::id.eq(id.into_inner()))
                        .filter(model_artifacts::project_id.eq(&project))
                        .select(model_artifacts::id)
                        .for_update()
                        .first::<uuid::Uuid>(tx)?;

                    diesel::update(
                        model_artifacts::table
                            .filter(model_artifacts::project_id.eq(&project))
                            .filter(model_artifacts::deployed.eq(true)),
                    )
                    .set(model_artifacts::deployed.eq(false))
                    .execute(tx)?;

                    diesel::update(model_artifacts::table.find(id.into_inner()))
                        .set((
                            model_artifacts::deployed.eq(true),
                            model_artifacts::deployed_at.eq(Some(at)),
                            model_artifacts::deployed_by.eq(deployed_by),
                        ))
                        .returning(ArtifactRow::as_returning())
                        .get_result(tx)
                })
                .map_err(|err| match err {
                    DieselError::NotFound => ArtifactRepositoryError::NotFound(id),
                    _ => ArtifactRepositoryError::persistence(err),
                })?;
            row_to_artifact(row)
        })
        .await
    }

    async fn clear_deployed(&self, project_id: &ProjectId) -> ArtifactRepositoryResult<()> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            diesel::update(
                model_artifacts::table
                    .filter(model_artifacts::project_id.eq(project))
                    .filter(model_artifacts::deployed.eq(true)),
            )
            .set(model_artifacts::deployed.eq(false))
            .execute(connection)
            .map_err(ArtifactRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn update_comment(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
        comment: Option<String>,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = diesel::update(
                model_artifacts::table
                    .filter(model_artifacts::id.eq(id.into_inner()))
                    .filter(model_artifacts::project_id.eq(project)),
            )
            .set(model_artifacts::comment.eq(comment))
            .returning(ArtifactRow::as_returning())
            .get_result(connection)
            .optional()
            .map_err(ArtifactRepositoryError::persistence)?;
            row.map(row_to_artifact).transpose()
        })
        .await
    }
}

fn to_new_row(artifact: &ModelArtifact) -> ArtifactRepositoryResult<NewArtifactRow> {
    let size_bytes =
        i64::try_from(artifact.file().size_bytes).map_err(ArtifactRepositoryError::persistence)?;
    Ok(NewArtifactRow {
        id: artifact.id().into_inner(),
        project_id: artifact.project_id().as_str().to_owned(),
        name: artifact.name().map(ToOwned::to_owned),
        comment: artifact.comment().map(ToOwned::to_owned),
        storage_path: artifact.storage_path().to_string(),
        size_bytes,
        sha256: artifact.file().sha256.clone(),
        deployed: artifact.is_deployed(),
        created_at: artifact.created_at(),
        deployed_at: artifact.deployed_at(),
        deployed_by: artifact.deployed_by().map(ToOwned::to_owned),
    })
}

fn row_to_artifact(row: ArtifactRow) -> ArtifactRepositoryResult<ModelArtifact> {
    let project_id =
        ProjectId::new(row.project_id).map_err(ArtifactRepositoryError::persistence)?;
    let size_bytes = u64::try_from(row.size_bytes).map_err(ArtifactRepositoryError::persistence)?;
    Ok(ModelArtifact::from_persisted(PersistedModelArtifactData {
        id: ArtifactId::from_uuid(row.id),
        project_id,
        name: row.name,
        comment: row.comment,
        file: ArtifactFile {
            storage_path: Utf8PathBuf::from(row.storage_path),
            size_bytes,
            sha256: row.sha256,
        },
        deployed: row.deployed,
        created_at: row.created_at,
        deployed_at: row.deployed_at,
        deployed_by: row.deployed_by,
    }))
}
