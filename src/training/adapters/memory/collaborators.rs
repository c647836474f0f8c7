//! In-memory payload source and notifiers.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex, PoisonError};

use crate::artifact::domain::{ArtifactId, ModelArtifact};
use crate::project::ProjectId;
use crate::training::{
    domain::ResolvedTrainingOptions,
    ports::{CollaboratorResult, ModelReadyNotifier, TrainingPayloadSource},
};

/// Payload source returning the same bytes for every project.
#[derive(Debug, Clone)]
pub struct StaticPayloadSource {
    payload: Bytes,
}

impl StaticPayloadSource {
    /// Creates a source that always returns `payload`.
    #[must_use]
    pub const fn new(payload: Bytes) -> Self {
        Self { payload }
    }
}

impl Default for StaticPayloadSource {
    fn default() -> Self {
        Self::new(Bytes::from_static(b"{}"))
    }
}

#[async_trait]
impl TrainingPayloadSource for StaticPayloadSource {
    async fn training_payload(
        &self,
        _project_id: &ProjectId,
        _options: &ResolvedTrainingOptions,
    ) -> CollaboratorResult<Bytes> {
        Ok(self.payload.clone())
    }
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModelReadyNotifier;

#[async_trait]
impl ModelReadyNotifier for NoopModelReadyNotifier {
    async fn notify_model_ready(
        &self,
        _project_id: &ProjectId,
        _artifact: &ModelArtifact,
    ) -> CollaboratorResult<()> {
        Ok(())
    }
}

/// Notifier recording every announced artifact.
#[derive(Debug, Clone, Default)]
pub struct RecordingModelReadyNotifier {
    seen: Arc<Mutex<Vec<(ProjectId, ArtifactId)>>>,
}

impl RecordingModelReadyNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notification received so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<(ProjectId, ArtifactId)> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ModelReadyNotifier for RecordingModelReadyNotifier {
    async fn notify_model_ready(
        &self,
        project_id: &ProjectId,
        artifact: &ModelArtifact,
    ) -> CollaboratorResult<()> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((project_id.clone(), artifact.id()));
        Ok(())
    }
}
