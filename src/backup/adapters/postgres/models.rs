//! Diesel row models for backup records.

use super::schema::backups;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for backup records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = backups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BackupRow {
    /// Backup identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: String,
    /// Location of the stored export.
    pub storage_path: String,
    /// Optional operator comment.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for backup records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = backups)]
pub struct NewBackupRow {
    /// Backup identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: String,
    /// Location of the stored export.
    pub storage_path: String,
    /// Optional operator comment.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
