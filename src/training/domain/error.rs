//! Error types for training domain validation and parsing.

use super::{TrainingJobId, TrainingStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating training values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrainingDomainError {
    /// The training host is not an absolute HTTP(S) URL.
    #[error("invalid training host '{0}', expected an http:// or https:// URL")]
    InvalidHost(String),

    /// The remote job identifier is empty after trimming.
    #[error("remote job identifier must not be empty")]
    EmptyRemoteJobId,

    /// A terminal job was asked to change status.
    #[error("training job {job_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Job being updated.
        job_id: TrainingJobId,
        /// Current status.
        from: TrainingStatus,
        /// Requested status.
        to: TrainingStatus,
    },
}

/// Error returned while parsing training statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown training status: {0}")]
pub struct ParseTrainingStatusError(pub String);
