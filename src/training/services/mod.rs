//! Training orchestration services.

mod orchestrator;
mod poller;

pub use orchestrator::{
    CancelOutcome, ReconcileOutcome, TrainingCollaborators, TrainingOrchestrator,
    TrainingServiceError, TrainingServiceResult,
};
pub use poller::{PollReport, TrainingPoller};
