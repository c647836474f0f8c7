//! `PostgreSQL` adapter for training job records.

mod models;
mod repository;
mod schema;

pub use repository::PostgresTrainingJobRepository;
