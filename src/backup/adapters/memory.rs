//! In-memory backup adapters for tests and single-process deployments.

use async_trait::async_trait;
use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backup::{
    domain::{Backup, BackupId},
    ports::{
        ArchiveError, ArchiveResult, BackupArchiveStore, BackupRepository, BackupRepositoryError,
        BackupRepositoryResult, ImportOptions, ImportSummary, ProjectArchiver,
    },
};
use crate::project::ProjectId;
use crate::storage::timestamped_file_name;

/// Thread-safe in-memory backup repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackupRepository {
    state: Arc<RwLock<HashMap<BackupId, Backup>>>,
}

impl InMemoryBackupRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackupRepository for InMemoryBackupRepository {
    async fn store(&self, backup: &Backup) -> BackupRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            BackupRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        if state.contains_key(&backup.id()) {
            return Err(BackupRepositoryError::DuplicateBackup(backup.id()));
        }
        state.insert(backup.id(), backup.clone());
        Ok(())
    }

    async fn find(
        &self,
        project_id: &ProjectId,
        id: BackupId,
    ) -> BackupRepositoryResult<Option<Backup>> {
        let state = self.state.read().map_err(|err| {
            BackupRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state
            .get(&id)
            .filter(|backup| backup.project_id() == project_id)
            .cloned())
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> BackupRepositoryResult<Vec<Backup>> {
        let state = self.state.read().map_err(|err| {
            BackupRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut backups: Vec<Backup> = state
            .values()
            .filter(|backup| backup.project_id() == project_id)
            .cloned()
            .collect();
        backups.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(backups)
    }
}

/// One import observed by [`InMemoryProjectArchiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImport {
    /// Target project.
    pub project_id: ProjectId,
    /// Imported export bytes.
    pub archive: Bytes,
    /// Options the import was invoked with.
    pub options: ImportOptions,
}

#[derive(Debug, Default)]
struct ArchiverState {
    contents: HashMap<ProjectId, Bytes>,
    imports: Vec<RecordedImport>,
    fail_exports: bool,
}

/// Project archiver holding each project's content as a single buffer.
///
/// Exports return the current buffer; imports replace it and are recorded for
/// inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectArchiver {
    state: Arc<RwLock<ArchiverState>>,
}

impl InMemoryProjectArchiver {
    /// Creates an archiver with no project content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a project's current content.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Storage`] when the state lock is poisoned.
    pub fn set_contents(&self, project_id: &ProjectId, contents: Bytes) -> ArchiveResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        state.contents.insert(project_id.clone(), contents);
        Ok(())
    }

    /// Returns a project's current content.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Storage`] when the state lock is poisoned.
    pub fn contents(&self, project_id: &ProjectId) -> ArchiveResult<Option<Bytes>> {
        let state = self
            .state
            .read()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        Ok(state.contents.get(project_id).cloned())
    }

    /// Makes subsequent exports fail.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Storage`] when the state lock is poisoned.
    pub fn fail_exports(&self, fail: bool) -> ArchiveResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        state.fail_exports = fail;
        Ok(())
    }

    /// Returns every import observed so far.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Storage`] when the state lock is poisoned.
    pub fn imports(&self) -> ArchiveResult<Vec<RecordedImport>> {
        let state = self
            .state
            .read()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        Ok(state.imports.clone())
    }
}

#[async_trait]
impl ProjectArchiver for InMemoryProjectArchiver {
    async fn export_project(&self, project_id: &ProjectId) -> ArchiveResult<Bytes> {
        let state = self
            .state
            .read()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        if state.fail_exports {
            return Err(ArchiveError::export(std::io::Error::other(format!(
                "export of {project_id} refused"
            ))));
        }
        Ok(state.contents.get(project_id).cloned().unwrap_or_default())
    }

    async fn import_project(
        &self,
        project_id: &ProjectId,
        archive: Bytes,
        options: ImportOptions,
    ) -> ArchiveResult<ImportSummary> {
        let mut state = self
            .state
            .write()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        state.imports.push(RecordedImport {
            project_id: project_id.clone(),
            archive: archive.clone(),
            options,
        });
        let imported_bytes = archive.len();
        state.contents.insert(project_id.clone(), archive);
        Ok(ImportSummary::new(json!({
            "project_id": project_id.as_str(),
            "imported_bytes": imported_bytes,
            "wiped": options.wipe_existing,
        })))
    }
}

/// Archive store keeping export files in memory under synthetic paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackupArchiveStore {
    files: Arc<RwLock<HashMap<Utf8PathBuf, Bytes>>>,
}

impl InMemoryBackupArchiveStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets a stored export, simulating out-of-band deletion.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Storage`] when the state lock is poisoned.
    pub fn remove(&self, path: &Utf8Path) -> ArchiveResult<()> {
        let mut files = self
            .files
            .write()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        files.remove(path);
        Ok(())
    }
}

#[async_trait]
impl BackupArchiveStore for InMemoryBackupArchiveStore {
    async fn write_archive(
        &self,
        project_id: &ProjectId,
        archive: Bytes,
        taken_at: DateTime<Utc>,
    ) -> ArchiveResult<Utf8PathBuf> {
        let path = Utf8PathBuf::from("memory")
            .join(project_id.as_str())
            .join(timestamped_file_name("backup", taken_at, "export"));
        let mut files = self
            .files
            .write()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        files.insert(path.clone(), archive);
        Ok(path)
    }

    async fn read_archive(&self, _project_id: &ProjectId, path: &Utf8Path) -> ArchiveResult<Bytes> {
        let files = self
            .files
            .read()
            .map_err(|err| ArchiveError::storage(std::io::Error::other(err.to_string())))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| ArchiveError::Missing(path.to_owned()))
    }
}
