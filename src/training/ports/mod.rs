//! Port contracts for the training lifecycle.

mod collaborators;
mod host;
mod repository;

pub use collaborators::{
    ArtifactCapture, CollaboratorError, CollaboratorResult, ModelReadyNotifier,
    PreTrainingSnapshot, TrainingPayloadSource,
};
#[cfg(test)]
pub use host::MockTrainingHost;
pub use host::{TrainingHost, TrainingHostError, TrainingHostResult, TrainingSubmission};
pub use repository::{
    TrainingJobRepository, TrainingJobRepositoryError, TrainingJobRepositoryResult,
};
