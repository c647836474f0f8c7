//! `PostgreSQL` repository implementation for backup records.

use super::{
    models::{BackupRow, NewBackupRow},
    schema::backups,
};
use crate::backup::{
    domain::{Backup, BackupId, PersistedBackupData},
    ports::{BackupRepository, BackupRepositoryError, BackupRepositoryResult},
};
use crate::postgres::PgPool;
use crate::project::ProjectId;
use async_trait::async_trait;
use camino::Utf8PathBuf;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed backup repository.
#[derive(Debug, Clone)]
pub struct PostgresBackupRepository {
    pool: PgPool,
}

impl PostgresBackupRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> BackupRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> BackupRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(BackupRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(BackupRepositoryError::persistence)?
    }
}

#[async_trait]
impl BackupRepository for PostgresBackupRepository {
    async fn store(&self, backup: &Backup) -> BackupRepositoryResult<()> {
        let backup_id = backup.id();
        let new_row = NewBackupRow {
            id: backup_id.into_inner(),
            project_id: backup.project_id().as_str().to_owned(),
            storage_path: backup.storage_path().to_string(),
            comment: backup.comment().map(ToOwned::to_owned),
            created_at: backup.created_at(),
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(backups::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        BackupRepositoryError::DuplicateBackup(backup_id)
                    }
                    _ => BackupRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        project_id: &ProjectId,
        id: BackupId,
    ) -> BackupRepositoryResult<Option<Backup>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = backups::table
                .filter(backups::id.eq(id.into_inner()))
                .filter(backups::project_id.eq(project))
                .select(BackupRow::as_select())
                .first::<BackupRow>(connection)
                .optional()
                .map_err(BackupRepositoryError::persistence)?;
            row.map(row_to_backup).transpose()
        })
        .await
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> BackupRepositoryResult<Vec<Backup>> {
        let project = project_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            backups::table
                .filter(backups::project_id.eq(project))
                .order(backups::created_at.desc())
                .select(BackupRow::as_select())
                .load::<BackupRow>(connection)
                .map_err(BackupRepositoryError::persistence)?
                .into_iter()
                .map(row_to_backup)
                .collect()
        })
        .await
    }
}

fn row_to_backup(row: BackupRow) -> BackupRepositoryResult<Backup> {
    let project_id =
        ProjectId::new(row.project_id).map_err(BackupRepositoryError::persistence)?;
    Ok(Backup::from_persisted(PersistedBackupData {
        id: BackupId::from_uuid(row.id),
        project_id,
        storage_path: Utf8PathBuf::from(row.storage_path),
        comment: row.comment,
        created_at: row.created_at,
    }))
}
