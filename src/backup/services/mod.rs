//! Backup orchestration services.

mod snapshots;

pub use snapshots::{BackupService, BackupServiceError, BackupServiceResult};
