//! Port contracts for backup persistence and project export.

mod archive;
mod repository;

pub use archive::{
    ArchiveError, ArchiveResult, BackupArchiveStore, ImportOptions, ImportSummary,
    ProjectArchiver,
};
pub use repository::{BackupRepository, BackupRepositoryError, BackupRepositoryResult};
