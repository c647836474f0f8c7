//! Port contracts for artifact persistence and model file storage.

mod files;
mod repository;

pub use files::{ModelFileError, ModelFileResult, ModelFileStore};
#[cfg(test)]
pub use repository::MockArtifactRepository;
pub use repository::{ArtifactRepository, ArtifactRepositoryError, ArtifactRepositoryResult};
