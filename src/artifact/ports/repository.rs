//! Repository port for model artifact records.

use crate::artifact::domain::{ArtifactId, ModelArtifact};
use crate::project::ProjectId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for artifact repository operations.
pub type ArtifactRepositoryResult<T> = Result<T, ArtifactRepositoryError>;

/// Model artifact persistence contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Stores a newly captured artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactRepositoryError::DuplicateArtifact`] when the
    /// identifier already exists.
    async fn store(&self, artifact: &ModelArtifact) -> ArtifactRepositoryResult<()>;

    /// Finds an artifact belonging to `project_id`.
    async fn find_by_id(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>>;

    /// Lists a project's artifacts, newest first.
    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactRepositoryResult<Vec<ModelArtifact>>;

    /// Returns the project's deployed artifact, if any.
    async fn find_deployed(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>>;

    /// Clears the deployed flag on every artifact of the project and sets it
    /// on `id`, as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactRepositoryError::NotFound`] when the artifact does
    /// not belong to the project; nothing changes in that case.
    async fn set_deployed(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
        deployed_by: Option<String>,
        at: DateTime<Utc>,
    ) -> ArtifactRepositoryResult<ModelArtifact>;

    /// Clears the deployed flag on every artifact of the project.
    async fn clear_deployed(&self, project_id: &ProjectId) -> ArtifactRepositoryResult<()>;

    /// Replaces an artifact's comment.
    ///
    /// Returns `None` when the artifact does not belong to the project.
    async fn update_comment(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
        comment: Option<String>,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>>;
}

/// Errors returned by artifact repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ArtifactRepositoryError {
    /// An artifact with the same identifier already exists.
    #[error("duplicate artifact identifier: {0}")]
    DuplicateArtifact(ArtifactId),

    /// The artifact does not exist for the project.
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ArtifactRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
