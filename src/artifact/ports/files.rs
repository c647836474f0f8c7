//! Port for model file storage and pointer publication.

use crate::artifact::domain::{ArtifactFile, ModelPointer};
use crate::project::ProjectId;
use crate::storage::ByteStream;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for model file operations.
pub type ModelFileResult<T> = Result<T, ModelFileError>;

/// Durable model file storage with atomic pointers.
#[async_trait]
pub trait ModelFileStore: Send + Sync {
    /// Writes a result stream under a timestamp-derived name.
    ///
    /// The stream is consumed and dropped before returning on every path. A
    /// failed write leaves no file behind.
    ///
    /// # Errors
    ///
    /// Returns [`ModelFileError::Stream`] when the stream fails and
    /// [`ModelFileError::Storage`] for storage failures.
    async fn write_model(
        &self,
        project_id: &ProjectId,
        stream: ByteStream,
        captured_at: DateTime<Utc>,
    ) -> ModelFileResult<ArtifactFile>;

    /// Returns whether a stored model file still exists.
    async fn contains(&self, project_id: &ProjectId, path: &Utf8Path) -> ModelFileResult<bool>;

    /// Atomically points `pointer` at a stored model file.
    async fn publish(
        &self,
        project_id: &ProjectId,
        pointer: ModelPointer,
        path: &Utf8Path,
    ) -> ModelFileResult<()>;

    /// Returns the file `pointer` currently resolves to.
    async fn resolve(
        &self,
        project_id: &ProjectId,
        pointer: ModelPointer,
    ) -> ModelFileResult<Option<Utf8PathBuf>>;
}

/// Errors returned by model file stores.
#[derive(Debug, Clone, Error)]
pub enum ModelFileError {
    /// The inbound result stream failed before completion.
    #[error("result stream failed: {0}")]
    Stream(Arc<dyn std::error::Error + Send + Sync>),

    /// The path is not a model file of the project.
    #[error("path {0} is not a model file of this project")]
    ForeignPath(Utf8PathBuf),

    /// Storage failure.
    #[error("model storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl ModelFileError {
    /// Wraps a stream failure.
    pub fn stream(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Stream(Arc::new(err))
    }

    /// Wraps a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
