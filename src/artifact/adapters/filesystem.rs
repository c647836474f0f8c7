//! Model file store on the local filesystem.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::artifact::{
    domain::{ArtifactFile, ModelPointer},
    ports::{ModelFileError, ModelFileResult, ModelFileStore},
};
use crate::project::ProjectId;
use crate::storage::{ByteStream, ProjectStorage, StorageError, timestamped_file_name};

/// Stores model files as `<root>/<project>/model-<timestamp>-<suffix>.tar.gz`
/// with `latest` and `current` symbolic links alongside.
#[derive(Debug, Clone)]
pub struct FilesystemModelFileStore {
    storage: ProjectStorage,
}

impl FilesystemModelFileStore {
    /// Creates a store over an opened storage root.
    #[must_use]
    pub const fn new(storage: ProjectStorage) -> Self {
        Self { storage }
    }

    fn file_name_of(&self, project_id: &ProjectId, path: &Utf8Path) -> ModelFileResult<String> {
        self.storage
            .file_name_within(project_id, path)
            .map(ToOwned::to_owned)
            .map_err(|_| ModelFileError::ForeignPath(path.to_owned()))
    }

    async fn run_blocking<F, T>(&self, f: F) -> ModelFileResult<T>
    where
        F: FnOnce(&ProjectStorage) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || f(&storage))
            .await
            .map_err(ModelFileError::storage)?
            .map_err(ModelFileError::storage)
    }
}

#[async_trait]
impl ModelFileStore for FilesystemModelFileStore {
    async fn write_model(
        &self,
        project_id: &ProjectId,
        stream: ByteStream,
        captured_at: DateTime<Utc>,
    ) -> ModelFileResult<ArtifactFile> {
        let file_name = timestamped_file_name("model", captured_at, "tar.gz");
        let written = self
            .storage
            .write_stream(project_id, &file_name, stream)
            .await
            .map_err(|err| match err {
                StorageError::Stream(source) => ModelFileError::stream(source),
                other => ModelFileError::storage(other),
            })?;
        Ok(ArtifactFile {
            storage_path: written.path,
            size_bytes: written.size_bytes,
            sha256: written.sha256,
        })
    }

    async fn contains(&self, project_id: &ProjectId, path: &Utf8Path) -> ModelFileResult<bool> {
        let file_name = self.file_name_of(project_id, path)?;
        let owner = project_id.clone();
        self.run_blocking(move |storage| storage.contains(&owner, &file_name))
            .await
    }

    async fn publish(
        &self,
        project_id: &ProjectId,
        pointer: ModelPointer,
        path: &Utf8Path,
    ) -> ModelFileResult<()> {
        let file_name = self.file_name_of(project_id, path)?;
        let owner = project_id.clone();
        self.run_blocking(move |storage| {
            storage.publish_pointer(&owner, pointer.file_name(), &file_name)
        })
        .await
    }

    async fn resolve(
        &self,
        project_id: &ProjectId,
        pointer: ModelPointer,
    ) -> ModelFileResult<Option<Utf8PathBuf>> {
        let owner = project_id.clone();
        self.run_blocking(move |storage| storage.resolve_pointer(&owner, pointer.file_name()))
            .await
    }
}
