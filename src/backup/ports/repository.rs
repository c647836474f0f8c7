//! Repository port for backup records.

use crate::backup::domain::{Backup, BackupId};
use crate::project::ProjectId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for backup repository operations.
pub type BackupRepositoryResult<T> = Result<T, BackupRepositoryError>;

/// Backup record persistence contract.
#[async_trait]
pub trait BackupRepository: Send + Sync {
    /// Stores a new backup record.
    ///
    /// # Errors
    ///
    /// Returns [`BackupRepositoryError::DuplicateBackup`] when the identifier
    /// already exists.
    async fn store(&self, backup: &Backup) -> BackupRepositoryResult<()>;

    /// Finds a backup belonging to `project_id`.
    ///
    /// Returns `None` when the backup does not exist or belongs to another
    /// project.
    async fn find(
        &self,
        project_id: &ProjectId,
        id: BackupId,
    ) -> BackupRepositoryResult<Option<Backup>>;

    /// Lists a project's backups, newest first.
    async fn list_for_project(&self, project_id: &ProjectId)
    -> BackupRepositoryResult<Vec<Backup>>;
}

/// Errors returned by backup repository implementations.
#[derive(Debug, Clone, Error)]
pub enum BackupRepositoryError {
    /// A backup with the same identifier already exists.
    #[error("duplicate backup identifier: {0}")]
    DuplicateBackup(BackupId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl BackupRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
