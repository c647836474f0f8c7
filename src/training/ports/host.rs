//! Port for the external training host.

use crate::config::ConfigError;
use crate::project::ProjectId;
use crate::storage::ByteStream;
use crate::training::domain::{HostUrl, RemoteJobId, TrainingStatus};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

/// Result type for training host operations.
pub type TrainingHostResult<T> = Result<T, TrainingHostError>;

/// Everything sent to the host to start a training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSubmission {
    /// Owning project.
    pub project_id: ProjectId,
    /// Container image; the host client falls back to its configured default.
    pub image: Option<String>,
    /// Extra trainer arguments.
    pub extra_args: Vec<String>,
    /// Preferred compute node.
    pub node: Option<String>,
    /// Serialized training data.
    pub payload: Bytes,
}

/// Protocol client for an operator-managed training host.
///
/// Implementations are stateless apart from configuration. Every operation
/// except [`TrainingHost::ping`] surfaces host failures verbatim.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrainingHost: Send + Sync {
    /// Checks liveness. Never fails; any error reads as `false`.
    async fn ping(&self, host: &HostUrl) -> bool;

    /// Starts a training run.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingHostError::Config`] when no image is available and
    /// [`TrainingHostError::Http`] for non-success responses.
    async fn train(
        &self,
        host: &HostUrl,
        submission: TrainingSubmission,
    ) -> TrainingHostResult<RemoteJobId>;

    /// Requests cancellation; returns whether the host accepted it.
    async fn cancel(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<bool>;

    /// Fetches the remote status.
    async fn status(&self, host: &HostUrl, job: &RemoteJobId)
    -> TrainingHostResult<TrainingStatus>;

    /// Fetches the remote logs.
    async fn logs(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<String>;

    /// Opens the result artifact as a lazy byte stream.
    async fn result(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<ByteStream>;
}

/// Errors returned by training host clients.
#[derive(Debug, Clone, Error)]
pub enum TrainingHostError {
    /// The host answered with a non-success status.
    #[error("training host returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the host.
        body: String,
    },

    /// Required configuration is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The training payload exceeds the configured ceiling.
    #[error("training payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Payload size.
        size: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// The result artifact exceeds the configured ceiling.
    #[error("training result exceeds the {limit} byte limit")]
    ResultTooLarge {
        /// Configured ceiling.
        limit: u64,
    },

    /// The host answered with a body this client cannot interpret.
    #[error("unexpected training host response: {0}")]
    UnexpectedResponse(String),

    /// Network or protocol failure before a response was received.
    #[error("training host transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl TrainingHostError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
