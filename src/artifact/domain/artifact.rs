//! Model artifact record.

use super::ArtifactId;
use crate::project::ProjectId;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Facts about a model file durably written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Location of the published file.
    pub storage_path: Utf8PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Lowercase hexadecimal SHA-256 digest.
    pub sha256: String,
}

/// A trained model file produced by a successful training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    id: ArtifactId,
    project_id: ProjectId,
    name: Option<String>,
    comment: Option<String>,
    file: ArtifactFile,
    deployed: bool,
    created_at: DateTime<Utc>,
    deployed_at: Option<DateTime<Utc>>,
    deployed_by: Option<String>,
}

/// Parameter object for reconstructing a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedModelArtifactData {
    /// Persisted artifact identifier.
    pub id: ArtifactId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional operator comment.
    pub comment: Option<String>,
    /// Stored file facts.
    pub file: ArtifactFile,
    /// Whether this artifact is the project's active model.
    pub deployed: bool,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
    /// Most recent activation timestamp.
    pub deployed_at: Option<DateTime<Utc>>,
    /// Actor behind the most recent activation.
    pub deployed_by: Option<String>,
}

impl ModelArtifact {
    /// Creates an undeployed artifact for a freshly written file.
    #[must_use]
    pub fn captured(
        project_id: ProjectId,
        name: Option<String>,
        file: ArtifactFile,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: ArtifactId::new(),
            project_id,
            name: normalize(name),
            comment: None,
            file,
            deployed: false,
            created_at: clock.utc().trunc_subsecs(6),
            deployed_at: None,
            deployed_by: None,
        }
    }

    /// Reconstructs an artifact from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedModelArtifactData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            name: data.name,
            comment: data.comment,
            file: data.file,
            deployed: data.deployed,
            created_at: data.created_at,
            deployed_at: data.deployed_at,
            deployed_by: data.deployed_by,
        }
    }

    /// Marks this artifact as the project's active model.
    pub fn activate(&mut self, deployed_by: Option<String>, at: DateTime<Utc>) {
        self.deployed = true;
        self.deployed_at = Some(at.trunc_subsecs(6));
        self.deployed_by = normalize(deployed_by);
    }

    /// Clears the active flag, keeping the activation history.
    pub const fn deactivate(&mut self) {
        self.deployed = false;
    }

    /// Replaces the operator comment; blank text clears it.
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = normalize(comment);
    }

    /// Returns the artifact identifier.
    #[must_use]
    pub const fn id(&self) -> ArtifactId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the operator comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the stored file facts.
    #[must_use]
    pub const fn file(&self) -> &ArtifactFile {
        &self.file
    }

    /// Returns the location of the stored model file.
    #[must_use]
    pub fn storage_path(&self) -> &Utf8Path {
        &self.file.storage_path
    }

    /// Returns whether this is the project's active model.
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        self.deployed
    }

    /// Returns the capture timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the most recent activation timestamp.
    #[must_use]
    pub const fn deployed_at(&self) -> Option<DateTime<Utc>> {
        self.deployed_at
    }

    /// Returns who performed the most recent activation.
    #[must_use]
    pub fn deployed_by(&self) -> Option<&str> {
        self.deployed_by.as_deref()
    }
}

fn normalize(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
