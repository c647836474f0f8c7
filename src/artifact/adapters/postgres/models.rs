//! Diesel row models for model artifact records.

use super::schema::model_artifacts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for artifact records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = model_artifacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArtifactRow {
    /// Artifact identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional operator comment.
    pub comment: Option<String>,
    /// Location of the stored model file.
    pub storage_path: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// SHA-256 digest of the file.
    pub sha256: String,
    /// Active-model flag.
    pub deployed: bool,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
    /// Most recent activation timestamp.
    pub deployed_at: Option<DateTime<Utc>>,
    /// Actor behind the most recent activation.
    pub deployed_by: Option<String>,
}

/// Insert model for artifact records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = model_artifacts)]
pub struct NewArtifactRow {
    /// Artifact identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional operator comment.
    pub comment: Option<String>,
    /// Location of the stored model file.
    pub storage_path: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// SHA-256 digest of the file.
    pub sha256: String,
    /// Active-model flag.
    pub deployed: bool,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
    /// Most recent activation timestamp.
    pub deployed_at: Option<DateTime<Utc>>,
    /// Actor behind the most recent activation.
    pub deployed_by: Option<String>,
}
