//! `PostgreSQL` adapter for backup records.

mod models;
mod repository;
mod schema;

pub use repository::PostgresBackupRepository;
