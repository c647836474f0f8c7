//! Ports for project exports and their on-disk archive files.

use crate::project::ProjectId;
use async_trait::async_trait;
use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for export and archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Options passed to a project import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOptions {
    /// Remove existing project content before importing.
    pub wipe_existing: bool,
}

/// Opaque description of what an import changed, as reported by the
/// importer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary(Value);

impl ImportSummary {
    /// Wraps an importer report.
    #[must_use]
    pub const fn new(report: Value) -> Self {
        Self(report)
    }

    /// Returns the importer report.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the summary, returning the importer report.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Project export and import pipeline.
#[async_trait]
pub trait ProjectArchiver: Send + Sync {
    /// Produces a full point-in-time export of a project.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Export`] when the export cannot be produced.
    async fn export_project(&self, project_id: &ProjectId) -> ArchiveResult<Bytes>;

    /// Imports an export into a project.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Import`] when the import fails.
    async fn import_project(
        &self,
        project_id: &ProjectId,
        archive: Bytes,
        options: ImportOptions,
    ) -> ArchiveResult<ImportSummary>;
}

/// Durable storage for export files.
#[async_trait]
pub trait BackupArchiveStore: Send + Sync {
    /// Writes an export for a project and returns where it was stored.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Storage`] when the file cannot be written.
    async fn write_archive(
        &self,
        project_id: &ProjectId,
        archive: Bytes,
        taken_at: DateTime<Utc>,
    ) -> ArchiveResult<Utf8PathBuf>;

    /// Reads a previously written export.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Missing`] when the file no longer exists and
    /// [`ArchiveError::Storage`] for other failures.
    async fn read_archive(&self, project_id: &ProjectId, path: &Utf8Path) -> ArchiveResult<Bytes>;
}

/// Errors returned by export pipelines and archive stores.
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// The project export could not be produced.
    #[error("project export failed: {0}")]
    Export(Arc<dyn std::error::Error + Send + Sync>),

    /// The project import failed.
    #[error("project import failed: {0}")]
    Import(Arc<dyn std::error::Error + Send + Sync>),

    /// A stored export file is missing.
    #[error("backup archive missing: {0}")]
    Missing(Utf8PathBuf),

    /// Archive file storage failed.
    #[error("backup archive storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl ArchiveError {
    /// Wraps an export failure.
    pub fn export(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Export(Arc::new(err))
    }

    /// Wraps an import failure.
    pub fn import(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Import(Arc::new(err))
    }

    /// Wraps a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
