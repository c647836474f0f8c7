//! Domain model for project backups.

mod backup;
mod ids;

pub use backup::{Backup, PersistedBackupData};
pub use ids::BackupId;
