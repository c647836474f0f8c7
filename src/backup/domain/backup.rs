//! Backup record.

use super::BackupId;
use crate::project::ProjectId;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Immutable pointer to a stored project export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    id: BackupId,
    project_id: ProjectId,
    storage_path: Utf8PathBuf,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBackupData {
    /// Persisted backup identifier.
    pub id: BackupId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Location of the stored export.
    pub storage_path: Utf8PathBuf,
    /// Optional operator comment.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Backup {
    /// Creates a backup record for an export already written to
    /// `storage_path`.
    ///
    /// Blank comments are dropped.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        storage_path: Utf8PathBuf,
        comment: Option<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: BackupId::new(),
            project_id,
            storage_path,
            comment: comment
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
            created_at: clock.utc().trunc_subsecs(6),
        }
    }

    /// Reconstructs a backup from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBackupData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            storage_path: data.storage_path,
            comment: data.comment,
            created_at: data.created_at,
        }
    }

    /// Returns the backup identifier.
    #[must_use]
    pub const fn id(&self) -> BackupId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the location of the stored export.
    #[must_use]
    pub fn storage_path(&self) -> &Utf8Path {
        &self.storage_path
    }

    /// Returns the operator comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
