//! Service layer for capturing and deploying model artifacts.

use crate::artifact::{
    domain::{ArtifactId, ModelArtifact, ModelPointer},
    ports::{ArtifactRepository, ArtifactRepositoryError, ModelFileError, ModelFileStore},
};
use crate::project::ProjectId;
use crate::storage::ByteStream;
use camino::Utf8PathBuf;
use dashmap::DashMap;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Service-level errors for artifact operations.
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    /// No artifact with the identifier exists for the project.
    #[error("artifact {artifact_id} not found for project {project_id}")]
    NotFound {
        /// Requested project.
        project_id: ProjectId,
        /// Requested artifact.
        artifact_id: ArtifactId,
    },

    /// The artifact record exists but its model file is gone.
    #[error("model file for artifact {artifact_id} is missing at {path}")]
    ArtifactMissing {
        /// Requested artifact.
        artifact_id: ArtifactId,
        /// Recorded storage path.
        path: Utf8PathBuf,
    },

    /// Model file storage failed.
    #[error(transparent)]
    Files(#[from] ModelFileError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ArtifactRepositoryError),
}

/// Result type for artifact service operations.
pub type ArtifactStoreResult<T> = Result<T, ArtifactStoreError>;

/// Outcome of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedArtifact {
    /// The artifact now marked deployed.
    pub artifact: ModelArtifact,
    /// Path the `current` pointer resolves to.
    pub path: Utf8PathBuf,
}

/// Captures model files and activates exactly one artifact per project.
#[derive(Clone)]
pub struct ArtifactStoreService<R, F, C>
where
    R: ArtifactRepository,
    F: ModelFileStore,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    files: Arc<F>,
    clock: Arc<C>,
    deploy_locks: Arc<DashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl<R, F, C> ArtifactStoreService<R, F, C>
where
    R: ArtifactRepository,
    F: ModelFileStore,
    C: Clock + Send + Sync,
{
    /// Creates a new artifact store service.
    #[must_use]
    pub fn new(repository: Arc<R>, files: Arc<F>, clock: Arc<C>) -> Self {
        Self {
            repository,
            files,
            clock,
            deploy_locks: Arc::new(DashMap::new()),
        }
    }

    /// Writes a model stream, records an undeployed artifact, and then
    /// republishes `latest` at it.
    ///
    /// `latest` only ever points at a recorded artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Files`] when the stream or storage fails
    /// and [`ArtifactStoreError::Repository`] when the record cannot be
    /// stored. A failed stream writes no record; a failed record leaves
    /// `latest` untouched.
    pub async fn save(
        &self,
        project_id: &ProjectId,
        stream: ByteStream,
        name: Option<String>,
    ) -> ArtifactStoreResult<ModelArtifact> {
        let file = self
            .files
            .write_model(project_id, stream, self.clock.utc())
            .await?;
        let artifact = ModelArtifact::captured(project_id.clone(), name, file, &*self.clock);
        self.repository.store(&artifact).await?;
        self.files
            .publish(project_id, ModelPointer::Latest, artifact.storage_path())
            .await?;
        info!(
            project = %project_id,
            artifact = %artifact.id(),
            path = %artifact.storage_path(),
            size_bytes = artifact.file().size_bytes,
            "model artifact captured"
        );
        Ok(artifact)
    }

    /// Makes `artifact_id` the project's only deployed artifact and points
    /// `current` at its file.
    ///
    /// Deploys of one project are serialised. The record change is applied
    /// first; if the pointer cannot be republished the previous deployment
    /// is restored.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::NotFound`] for unknown artifacts and
    /// [`ArtifactStoreError::ArtifactMissing`] when the model file is gone.
    /// Neither mutates any record.
    pub async fn deploy(
        &self,
        project_id: &ProjectId,
        artifact_id: ArtifactId,
        deployed_by: Option<String>,
    ) -> ArtifactStoreResult<DeployedArtifact> {
        let lock = self.deploy_lock(project_id);
        let _guard = lock.lock().await;

        let Some(target) = self.repository.find_by_id(project_id, artifact_id).await? else {
            return Err(ArtifactStoreError::NotFound {
                project_id: project_id.clone(),
                artifact_id,
            });
        };
        if !self.files.contains(project_id, target.storage_path()).await? {
            warn!(
                project = %project_id,
                artifact = %artifact_id,
                path = %target.storage_path(),
                "deploy aborted: model file missing"
            );
            return Err(ArtifactStoreError::ArtifactMissing {
                artifact_id,
                path: target.storage_path().to_owned(),
            });
        }

        let previous = self.repository.find_deployed(project_id).await?;
        let deployed = self
            .repository
            .set_deployed(project_id, artifact_id, deployed_by, self.clock.utc())
            .await?;

        if let Err(err) = self
            .files
            .publish(project_id, ModelPointer::Current, deployed.storage_path())
            .await
        {
            self.restore(project_id, previous).await;
            return Err(err.into());
        }

        info!(project = %project_id, artifact = %artifact_id, "model artifact deployed");
        Ok(DeployedArtifact {
            path: deployed.storage_path().to_owned(),
            artifact: deployed,
        })
    }

    /// Replaces an artifact's comment.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::NotFound`] for unknown artifacts.
    pub async fn update_comment(
        &self,
        project_id: &ProjectId,
        artifact_id: ArtifactId,
        comment: Option<String>,
    ) -> ArtifactStoreResult<ModelArtifact> {
        self.repository
            .update_comment(project_id, artifact_id, comment)
            .await?
            .ok_or_else(|| ArtifactStoreError::NotFound {
                project_id: project_id.clone(),
                artifact_id,
            })
    }

    /// Lists a project's artifacts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Repository`] when the lookup fails.
    pub async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactStoreResult<Vec<ModelArtifact>> {
        Ok(self.repository.list_for_project(project_id).await?)
    }

    /// Returns the project's deployed artifact, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Repository`] when the lookup fails.
    pub async fn deployed_for_project(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactStoreResult<Option<ModelArtifact>> {
        Ok(self.repository.find_deployed(project_id).await?)
    }

    /// Returns the file the `current` pointer resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Files`] when the pointer cannot be read.
    pub async fn current_path(&self, project_id: &ProjectId) -> ArtifactStoreResult<Option<Utf8PathBuf>> {
        Ok(self.files.resolve(project_id, ModelPointer::Current).await?)
    }

    fn deploy_lock(&self, project_id: &ProjectId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.deploy_locks
                .entry(project_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    async fn restore(&self, project_id: &ProjectId, previous: Option<ModelArtifact>) {
        let restored = match previous {
            Some(artifact) => self
                .repository
                .set_deployed(
                    project_id,
                    artifact.id(),
                    artifact.deployed_by().map(ToOwned::to_owned),
                    artifact.deployed_at().unwrap_or_else(|| self.clock.utc()),
                )
                .await
                .map(|_| ()),
            None => self.repository.clear_deployed(project_id).await,
        };
        if let Err(err) = restored {
            error!(
                project = %project_id,
                error = %err,
                "failed to restore previous deployment after pointer swap failure"
            );
        }
    }
}
