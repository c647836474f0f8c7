//! Diesel schema for training job records.

diesel::table! {
    /// Remote training invocations.
    training_jobs (id) {
        /// Local job identifier.
        id -> Uuid,
        /// Host-assigned job identifier.
        #[max_length = 255]
        remote_job_id -> Varchar,
        /// Owning project.
        #[max_length = 64]
        project_id -> Varchar,
        /// Host base URL.
        host -> Text,
        /// Optional display name.
        name -> Nullable<Text>,
        /// Pre-training snapshot.
        backup_id -> Uuid,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Last fetched logs.
        logs -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Version token.
        updated_at -> Timestamptz,
    }
}
