//! In-memory training adapters for tests and single-process deployments.

mod collaborators;
mod host;
mod repository;

pub use collaborators::{NoopModelReadyNotifier, RecordingModelReadyNotifier, StaticPayloadSource};
pub use host::{ScriptedTrainingHost, TrainCall};
pub use repository::InMemoryTrainingJobRepository;
