//! Shared `PostgreSQL` plumbing for the durable registries.

use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use thiserror::Error;
use tracing::info;

/// `PostgreSQL` connection pool used by every repository adapter.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const INITIAL_SCHEMA: &str =
    include_str!("../migrations/2026-10-01-000000_create_training_lifecycle_tables/up.sql");

/// Errors raised while preparing the database.
#[derive(Debug, Error)]
pub enum DatabaseSetupError {
    /// The pool could not be built or a connection could not be checked out.
    #[error("database connection failed: {0}")]
    Connection(#[from] PoolError),

    /// Schema statements failed.
    #[error("schema migration failed: {0}")]
    Migration(#[from] diesel::result::Error),
}

/// Builds a connection pool for `database_url`.
///
/// # Errors
///
/// Returns [`DatabaseSetupError::Connection`] when no connection can be
/// established.
pub fn connect(database_url: &str) -> Result<PgPool, DatabaseSetupError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder().build(manager)?)
}

/// Creates the training lifecycle tables when they do not exist yet.
///
/// # Errors
///
/// Returns [`DatabaseSetupError`] when a connection cannot be obtained or a
/// statement fails.
pub fn apply_migrations(pool: &PgPool) -> Result<(), DatabaseSetupError> {
    let mut connection = pool.get()?;
    connection.batch_execute(INITIAL_SCHEMA)?;
    info!("training lifecycle schema is up to date");
    Ok(())
}
