//! Diesel schema for model artifact records.

diesel::table! {
    /// Captured model artifacts.
    model_artifacts (id) {
        /// Artifact identifier.
        id -> Uuid,
        /// Owning project.
        #[max_length = 64]
        project_id -> Varchar,
        /// Optional display name.
        name -> Nullable<Text>,
        /// Optional operator comment.
        comment -> Nullable<Text>,
        /// Location of the stored model file.
        storage_path -> Text,
        /// File size in bytes.
        size_bytes -> Int8,
        /// SHA-256 digest of the file.
        #[max_length = 64]
        sha256 -> Varchar,
        /// Active-model flag; at most one per project.
        deployed -> Bool,
        /// Capture timestamp.
        created_at -> Timestamptz,
        /// Most recent activation timestamp.
        deployed_at -> Nullable<Timestamptz>,
        /// Actor behind the most recent activation.
        deployed_by -> Nullable<Text>,
    }
}
