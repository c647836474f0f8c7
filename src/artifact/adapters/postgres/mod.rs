//! `PostgreSQL` adapter for model artifact records.

mod models;
mod repository;
mod schema;

pub use repository::PostgresArtifactRepository;
