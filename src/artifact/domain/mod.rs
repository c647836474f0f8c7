//! Domain model for model artifacts.

mod artifact;
mod ids;
mod pointer;

pub use artifact::{ArtifactFile, ModelArtifact, PersistedModelArtifactData};
pub use ids::ArtifactId;
pub use pointer::ModelPointer;
