//! Artifact orchestration services.

mod store;

pub use store::{ArtifactStoreError, ArtifactStoreResult, ArtifactStoreService, DeployedArtifact};
