//! Narrow ports onto the collaborators a training run depends on.
//!
//! Backups and artifact capture are implemented by sibling contexts; the
//! payload source and model-ready notification are supplied by the embedding
//! application.

use crate::artifact::domain::ModelArtifact;
use crate::backup::domain::BackupId;
use crate::project::ProjectId;
use crate::storage::ByteStream;
use crate::training::domain::ResolvedTrainingOptions;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Takes the snapshot every training job must reference.
#[async_trait]
pub trait PreTrainingSnapshot: Send + Sync {
    /// Creates a full project backup and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Backup`] when no backup was stored.
    async fn snapshot(
        &self,
        project_id: &ProjectId,
        comment: Option<String>,
    ) -> CollaboratorResult<BackupId>;
}

/// Assembles the training data for a project.
#[async_trait]
pub trait TrainingPayloadSource: Send + Sync {
    /// Returns the serialized training data.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Payload`] when the data cannot be built.
    async fn training_payload(
        &self,
        project_id: &ProjectId,
        options: &ResolvedTrainingOptions,
    ) -> CollaboratorResult<Bytes>;
}

/// Durably stores a training result.
#[async_trait]
pub trait ArtifactCapture: Send + Sync {
    /// Consumes the result stream and records an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Artifact`] when the artifact was not
    /// stored.
    async fn capture(
        &self,
        project_id: &ProjectId,
        result: ByteStream,
        name: Option<String>,
    ) -> CollaboratorResult<ModelArtifact>;
}

/// Receives notice that a new model artifact is available.
#[async_trait]
pub trait ModelReadyNotifier: Send + Sync {
    /// Announces a captured artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::Notification`] when delivery fails.
    async fn notify_model_ready(
        &self,
        project_id: &ProjectId,
        artifact: &ModelArtifact,
    ) -> CollaboratorResult<()>;
}

/// Errors returned by collaborators.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// Backup creation failed.
    #[error("pre-training backup failed: {0}")]
    Backup(Arc<dyn std::error::Error + Send + Sync>),

    /// Training payload assembly failed.
    #[error("training payload unavailable: {0}")]
    Payload(Arc<dyn std::error::Error + Send + Sync>),

    /// Artifact capture failed.
    #[error("artifact capture failed: {0}")]
    Artifact(Arc<dyn std::error::Error + Send + Sync>),

    /// Notification delivery failed.
    #[error("model-ready notification failed: {0}")]
    Notification(Arc<dyn std::error::Error + Send + Sync>),
}

impl CollaboratorError {
    /// Wraps a backup failure.
    pub fn backup(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backup(Arc::new(err))
    }

    /// Wraps a payload failure.
    pub fn payload(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Payload(Arc::new(err))
    }

    /// Wraps an artifact capture failure.
    pub fn artifact(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Artifact(Arc::new(err))
    }

    /// Wraps a notification failure.
    pub fn notification(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Notification(Arc::new(err))
    }
}
