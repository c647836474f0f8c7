//! Diesel schema for backup records.

diesel::table! {
    /// Pre-training project exports.
    backups (id) {
        /// Backup identifier.
        id -> Uuid,
        /// Owning project.
        #[max_length = 64]
        project_id -> Varchar,
        /// Location of the stored export.
        storage_path -> Text,
        /// Optional operator comment.
        comment -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}
