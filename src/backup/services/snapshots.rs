//! Service layer for taking and restoring project backups.

use crate::backup::{
    domain::{Backup, BackupId},
    ports::{
        ArchiveError, BackupArchiveStore, BackupRepository, BackupRepositoryError, ImportOptions,
        ImportSummary, ProjectArchiver,
    },
};
use crate::project::ProjectId;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Service-level errors for backup operations.
#[derive(Debug, Error)]
pub enum BackupServiceError {
    /// No backup with the identifier exists for the project.
    #[error("backup {backup_id} not found for project {project_id}")]
    NotFound {
        /// Requested project.
        project_id: ProjectId,
        /// Requested backup.
        backup_id: BackupId,
    },

    /// Export, import, or archive storage failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] BackupRepositoryError),
}

/// Result type for backup service operations.
pub type BackupServiceResult<T> = Result<T, BackupServiceError>;

/// Takes full project exports and restores them on request.
#[derive(Clone)]
pub struct BackupService<R, S, A, C>
where
    R: BackupRepository,
    S: BackupArchiveStore,
    A: ProjectArchiver,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    archives: Arc<S>,
    archiver: Arc<A>,
    clock: Arc<C>,
}

impl<R, S, A, C> BackupService<R, S, A, C>
where
    R: BackupRepository,
    S: BackupArchiveStore,
    A: ProjectArchiver,
    C: Clock + Send + Sync,
{
    /// Creates a new backup service.
    #[must_use]
    pub const fn new(repository: Arc<R>, archives: Arc<S>, archiver: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            repository,
            archives,
            archiver,
            clock,
        }
    }

    /// Exports the project, stores the export, and records it.
    ///
    /// # Errors
    ///
    /// Returns [`BackupServiceError::Archive`] when exporting or writing the
    /// export fails and [`BackupServiceError::Repository`] when the record
    /// cannot be stored. No record is written unless the export was stored.
    pub async fn create(
        &self,
        project_id: &ProjectId,
        comment: Option<String>,
    ) -> BackupServiceResult<Backup> {
        let export = self.archiver.export_project(project_id).await?;
        let taken_at = self.clock.utc();
        let storage_path = self
            .archives
            .write_archive(project_id, export, taken_at)
            .await?;
        let backup = Backup::new(project_id.clone(), storage_path, comment, &*self.clock);
        self.repository.store(&backup).await?;
        info!(
            project = %project_id,
            backup = %backup.id(),
            path = %backup.storage_path(),
            "backup created"
        );
        Ok(backup)
    }

    /// Restores a backup into its project, wiping existing content first.
    ///
    /// # Errors
    ///
    /// Returns [`BackupServiceError::NotFound`] without touching the project
    /// when the backup is unknown, and [`BackupServiceError::Archive`] when
    /// the export is missing or the import fails.
    pub async fn checkout(
        &self,
        project_id: &ProjectId,
        backup_id: BackupId,
    ) -> BackupServiceResult<ImportSummary> {
        let Some(backup) = self.repository.find(project_id, backup_id).await? else {
            warn!(project = %project_id, backup = %backup_id, "checkout of unknown backup");
            return Err(BackupServiceError::NotFound {
                project_id: project_id.clone(),
                backup_id,
            });
        };
        let export = self
            .archives
            .read_archive(project_id, backup.storage_path())
            .await?;
        let summary = self
            .archiver
            .import_project(project_id, export, ImportOptions { wipe_existing: true })
            .await?;
        info!(project = %project_id, backup = %backup_id, "backup restored");
        Ok(summary)
    }

    /// Lists a project's backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BackupServiceError::Repository`] when the lookup fails.
    pub async fn list(&self, project_id: &ProjectId) -> BackupServiceResult<Vec<Backup>> {
        Ok(self.repository.list_for_project(project_id).await?)
    }
}
