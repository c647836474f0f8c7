//! Project-scoped filesystem storage with crash-safe publication.
//!
//! Every project owns one directory below a storage root. Files are written
//! under a hidden staging name and renamed into place once fully flushed, so a
//! crash never leaves a truncated file under its final name. Named pointers
//! (`latest`, `current`) are symbolic links republished through the same
//! stage-then-rename sequence.

mod pointer;

use crate::project::ProjectId;
use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// Lazy, finite, non-restartable sequence of bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by [`ProjectStorage`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file name is not a single visible path component.
    #[error("invalid storage file name: {0}")]
    InvalidFileName(String),

    /// A pointer was asked to target a file that does not exist.
    #[error("pointer target {0} does not exist")]
    MissingTarget(String),

    /// The inbound byte stream failed before completion.
    #[error("byte stream failed: {0}")]
    Stream(#[source] io::Error),

    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Facts recorded while a file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Path of the published file.
    pub path: Utf8PathBuf,
    /// Number of bytes written.
    pub size_bytes: u64,
    /// Lowercase hexadecimal SHA-256 digest of the contents.
    pub sha256: String,
}

/// Filesystem root holding one directory per project.
#[derive(Debug, Clone)]
pub struct ProjectStorage {
    root: Arc<Dir>,
    root_path: Utf8PathBuf,
}

impl ProjectStorage {
    /// Opens (creating when absent) the storage root at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(path: impl AsRef<Utf8Path>) -> StorageResult<Self> {
        let root_path = path.as_ref().to_owned();
        Dir::create_ambient_dir_all(&root_path, ambient_authority())?;
        let root = Dir::open_ambient_dir(&root_path, ambient_authority())?;
        Ok(Self {
            root: Arc::new(root),
            root_path,
        })
    }

    /// Returns the storage root path.
    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    /// Returns the path a project file is published under.
    #[must_use]
    pub fn path_of(&self, project_id: &ProjectId, file_name: &str) -> Utf8PathBuf {
        self.root_path.join(project_id.as_str()).join(file_name)
    }

    /// Maps a stored path back to its file name, provided it lies directly in
    /// the project's directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidFileName`] for paths outside the
    /// project directory.
    pub fn file_name_within<'a>(
        &self,
        project_id: &ProjectId,
        path: &'a Utf8Path,
    ) -> StorageResult<&'a str> {
        let project_dir = self.root_path.join(project_id.as_str());
        let file_name = path
            .strip_prefix(&project_dir)
            .ok()
            .map(Utf8Path::as_str)
            .ok_or_else(|| StorageError::InvalidFileName(path.to_string()))?;
        validate_file_name(file_name)?;
        Ok(file_name)
    }

    fn project_dir(&self, project_id: &ProjectId) -> StorageResult<Dir> {
        self.root.create_dir_all(project_id.as_str())?;
        Ok(self.root.open_dir(project_id.as_str())?)
    }

    /// Writes a byte stream to `file_name` in the project's directory.
    ///
    /// The stream is consumed to completion or failure and dropped before
    /// returning. On failure the staging file is removed and nothing appears
    /// under `file_name`. On success the file and the rename are both synced
    /// to disk. Directory work runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Stream`] when the stream yields an error and
    /// [`StorageError::Io`] for filesystem failures.
    pub async fn write_stream(
        &self,
        project_id: &ProjectId,
        file_name: &str,
        stream: ByteStream,
    ) -> StorageResult<WrittenFile> {
        validate_file_name(file_name)?;
        let staging_name = format!(".{file_name}.partial");

        let storage = self.clone();
        let owner = project_id.clone();
        let staging = staging_name.clone();
        let (dir, staging_file) = run_blocking(move || {
            let dir = storage.project_dir(&owner)?;
            let file = dir.create(&staging)?;
            Ok((dir, file))
        })
        .await?;

        let mut file = tokio::fs::File::from_std(staging_file.into_std());
        let copied = copy_stream(&mut file, stream).await;
        drop(file);

        let target = file_name.to_owned();
        let (size_bytes, sha256) = run_blocking(move || {
            let facts = match copied {
                Ok(written) => written,
                Err(err) => {
                    discard(&dir, &staging_name);
                    return Err(err);
                }
            };
            if let Err(err) = dir.rename(&staging_name, &dir, &target) {
                discard(&dir, &staging_name);
                return Err(err.into());
            }
            sync_dir(&dir)?;
            Ok(facts)
        })
        .await?;

        Ok(WrittenFile {
            path: self.path_of(project_id, file_name),
            size_bytes,
            sha256,
        })
    }

    /// Writes an in-memory buffer to `file_name` in the project's directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] for filesystem failures.
    pub async fn write_bytes(
        &self,
        project_id: &ProjectId,
        file_name: &str,
        contents: Bytes,
    ) -> StorageResult<WrittenFile> {
        let stream: ByteStream = Box::pin(futures::stream::once(async move { Ok(contents) }));
        self.write_stream(project_id, file_name, stream).await
    }

    /// Reads a whole project file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the file is missing or unreadable.
    pub fn read_bytes(&self, project_id: &ProjectId, file_name: &str) -> StorageResult<Bytes> {
        validate_file_name(file_name)?;
        let dir = self.project_dir(project_id)?;
        Ok(Bytes::from(dir.read(file_name)?))
    }

    /// Returns whether a project file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when existence cannot be determined.
    pub fn contains(&self, project_id: &ProjectId, file_name: &str) -> StorageResult<bool> {
        validate_file_name(file_name)?;
        let dir = self.project_dir(project_id)?;
        Ok(dir.try_exists(file_name)?)
    }

    /// Atomically points `pointer` at `target_file` within the project's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingTarget`] when `target_file` does not
    /// exist and [`StorageError::Io`] when the link cannot be published.
    pub fn publish_pointer(
        &self,
        project_id: &ProjectId,
        pointer: &str,
        target_file: &str,
    ) -> StorageResult<()> {
        validate_file_name(pointer)?;
        validate_file_name(target_file)?;
        let dir = self.project_dir(project_id)?;
        if !dir.try_exists(target_file)? {
            return Err(StorageError::MissingTarget(target_file.to_owned()));
        }
        pointer::publish(&dir, pointer, target_file)
    }

    /// Returns the file a pointer currently resolves to, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the pointer cannot be read.
    pub fn resolve_pointer(
        &self,
        project_id: &ProjectId,
        pointer: &str,
    ) -> StorageResult<Option<Utf8PathBuf>> {
        validate_file_name(pointer)?;
        let dir = self.project_dir(project_id)?;
        let target = pointer::read(&dir, pointer)?;
        Ok(target.map(|file_name| self.path_of(project_id, file_name.as_str())))
    }
}

/// Builds a collision-resistant file name ordered by creation time, e.g.
/// `model-20261001T120000123456Z-1a2b3c4d.tar.gz`.
#[must_use]
pub fn timestamped_file_name(prefix: &str, at: DateTime<Utc>, extension: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!(
        "{prefix}-{}-{suffix}.{extension}",
        at.format("%Y%m%dT%H%M%S%6fZ")
    )
}

async fn copy_stream(
    file: &mut tokio::fs::File,
    mut stream: ByteStream,
) -> StorageResult<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut size_bytes: u64 = 0;
    while let Some(next) = stream.next().await {
        let chunk = next.map_err(StorageError::Stream)?;
        hasher.update(&chunk);
        size_bytes = size_bytes.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok((size_bytes, format!("{:x}", hasher.finalize())))
}

async fn run_blocking<F, T>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| StorageError::Io(io::Error::other(err)))?
}

/// Flushes directory entries, making a completed rename durable.
#[cfg(unix)]
fn sync_dir(dir: &Dir) -> io::Result<()> {
    dir.as_cap_std().try_clone()?.into_std_file().sync_all()
}

#[cfg(not(unix))]
const fn sync_dir(_dir: &Dir) -> io::Result<()> {
    Ok(())
}

fn discard(dir: &Dir, staging_name: &str) {
    if let Err(err) = dir.remove_file(staging_name) {
        warn!(file = staging_name, error = %err, "failed to remove staging file");
    }
}

fn validate_file_name(file_name: &str) -> StorageResult<()> {
    let is_valid = !file_name.is_empty()
        && !file_name.starts_with('.')
        && !file_name.contains(['/', '\\']);
    if is_valid {
        Ok(())
    } else {
        Err(StorageError::InvalidFileName(file_name.to_owned()))
    }
}
