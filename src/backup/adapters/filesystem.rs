//! Backup archive store on the local filesystem.

use async_trait::async_trait;
use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::io;

use crate::backup::ports::{ArchiveError, ArchiveResult, BackupArchiveStore};
use crate::project::ProjectId;
use crate::storage::{ProjectStorage, StorageError, timestamped_file_name};

/// Writes each export as `<root>/<project>/backup-<timestamp>-<suffix>.export`.
#[derive(Debug, Clone)]
pub struct FilesystemBackupArchiveStore {
    storage: ProjectStorage,
}

impl FilesystemBackupArchiveStore {
    /// Creates a store over an opened storage root.
    #[must_use]
    pub const fn new(storage: ProjectStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl BackupArchiveStore for FilesystemBackupArchiveStore {
    async fn write_archive(
        &self,
        project_id: &ProjectId,
        archive: Bytes,
        taken_at: DateTime<Utc>,
    ) -> ArchiveResult<Utf8PathBuf> {
        let file_name = timestamped_file_name("backup", taken_at, "export");
        let written = self
            .storage
            .write_bytes(project_id, &file_name, archive)
            .await
            .map_err(ArchiveError::storage)?;
        Ok(written.path)
    }

    async fn read_archive(&self, project_id: &ProjectId, path: &Utf8Path) -> ArchiveResult<Bytes> {
        let file_name = self
            .storage
            .file_name_within(project_id, path)
            .map_err(ArchiveError::storage)?
            .to_owned();
        let storage = self.storage.clone();
        let owner = project_id.clone();
        let read = tokio::task::spawn_blocking(move || storage.read_bytes(&owner, &file_name))
            .await
            .map_err(ArchiveError::storage)?;
        match read {
            Ok(contents) => Ok(contents),
            Err(StorageError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Err(ArchiveError::Missing(path.to_owned()))
            }
            Err(err) => Err(ArchiveError::storage(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        store: FilesystemBackupArchiveStore,
        project_id: ProjectId,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
        let storage = ProjectStorage::open(root.join("backups")).expect("storage should open");
        Fixture {
            _temp: temp,
            store: FilesystemBackupArchiveStore::new(storage),
            project_id: ProjectId::new("bf").expect("valid project"),
        }
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn written_archive_reads_back(fixture: Fixture) {
        let path = fixture
            .store
            .write_archive(&fixture.project_id, Bytes::from_static(b"{\"intents\":[]}"), Utc::now())
            .await
            .expect("write should succeed");

        assert!(path.as_str().contains("/bf/backup-"));
        assert_eq!(path.extension(), Some("export"));
        let contents = fixture
            .store
            .read_archive(&fixture.project_id, &path)
            .await
            .expect("read should succeed");
        assert_eq!(contents.as_ref(), b"{\"intents\":[]}");
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn deleted_archive_is_reported_missing(fixture: Fixture) {
        let path = fixture
            .store
            .write_archive(&fixture.project_id, Bytes::from_static(b"export"), Utc::now())
            .await
            .expect("write should succeed");
        std::fs::remove_file(&path).expect("remove archive");

        let result = fixture.store.read_archive(&fixture.project_id, &path).await;
        assert!(matches!(result, Err(ArchiveError::Missing(missing)) if missing == path));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn foreign_paths_are_refused(fixture: Fixture) {
        let result = fixture
            .store
            .read_archive(&fixture.project_id, Utf8Path::new("/etc/passwd"))
            .await;
        assert!(matches!(result, Err(ArchiveError::Storage(_))));
    }
}
