//! Domain model for training jobs.

mod error;
mod host;
mod ids;
mod job;
mod options;
mod status;

pub use error::{ParseTrainingStatusError, TrainingDomainError};
pub use host::HostUrl;
pub use ids::{RemoteJobId, TrainingJobId};
pub use job::{NewTrainingJob, PersistedTrainingJobData, TrainingJob};
pub use options::{ResolvedTrainingOptions, TrainingOptions};
pub use status::TrainingStatus;
