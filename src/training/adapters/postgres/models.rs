//! Diesel row models for training job records.

use super::schema::training_jobs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for training jobs.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = training_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrainingJobRow {
    /// Local job identifier.
    pub id: uuid::Uuid,
    /// Host-assigned job identifier.
    pub remote_job_id: String,
    /// Owning project.
    pub project_id: String,
    /// Host base URL.
    pub host: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Pre-training snapshot.
    pub backup_id: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Last fetched logs.
    pub logs: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Version token.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for training jobs.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = training_jobs)]
pub struct NewTrainingJobRow {
    /// Local job identifier.
    pub id: uuid::Uuid,
    /// Host-assigned job identifier.
    pub remote_job_id: String,
    /// Owning project.
    pub project_id: String,
    /// Host base URL.
    pub host: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Pre-training snapshot.
    pub backup_id: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Last fetched logs.
    pub logs: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Version token.
    pub updated_at: DateTime<Utc>,
}
