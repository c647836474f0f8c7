//! Reconcile daemon for training jobs.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://... trainyard
//! ```
//!
//! The daemon loads configuration from the environment (and `.env`), applies
//! the schema, and reconciles every active training job on the configured
//! interval until interrupted. Captured models land under
//! `TRAINYARD_ARTIFACT_ROOT`; the optional webhook is called for each one.
//!
//! Submission is served by the embedding application, so this process
//! refuses snapshot and payload requests.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use mockable::DefaultClock;
use tokio::sync::watch;
use tracing::{debug, error, info};
use trainyard::artifact::{
    adapters::{filesystem::FilesystemModelFileStore, postgres::PostgresArtifactRepository},
    services::ArtifactStoreService,
};
use trainyard::backup::domain::BackupId;
use trainyard::config::TrainyardConfig;
use trainyard::postgres;
use trainyard::project::ProjectId;
use trainyard::storage::ProjectStorage;
use trainyard::telemetry::init_tracing;
use trainyard::training::{
    adapters::{
        http::{HttpTrainingHost, WebhookModelReadyNotifier},
        memory::NoopModelReadyNotifier,
        postgres::PostgresTrainingJobRepository,
    },
    domain::ResolvedTrainingOptions,
    ports::{
        CollaboratorError, CollaboratorResult, ModelReadyNotifier, PreTrainingSnapshot,
        TrainingPayloadSource,
    },
    services::{TrainingCollaborators, TrainingOrchestrator, TrainingPoller},
};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Collaborator standing in for the submission path.
struct SubmissionDisabled;

#[async_trait]
impl PreTrainingSnapshot for SubmissionDisabled {
    async fn snapshot(
        &self,
        project_id: &ProjectId,
        _comment: Option<String>,
    ) -> CollaboratorResult<BackupId> {
        Err(CollaboratorError::backup(io::Error::other(format!(
            "the reconcile daemon does not take backups (project {project_id})"
        ))))
    }
}

#[async_trait]
impl TrainingPayloadSource for SubmissionDisabled {
    async fn training_payload(
        &self,
        project_id: &ProjectId,
        _options: &ResolvedTrainingOptions,
    ) -> CollaboratorResult<Bytes> {
        Err(CollaboratorError::payload(io::Error::other(format!(
            "the reconcile daemon does not build training data (project {project_id})"
        ))))
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing("info");
    let config = TrainyardConfig::from_env()?;

    let pool = postgres::connect(config.require_database_url()?)?;
    let migration_pool = pool.clone();
    tokio::task::spawn_blocking(move || postgres::apply_migrations(&migration_pool)).await??;

    let clock = Arc::new(DefaultClock);
    let artifacts = ArtifactStoreService::new(
        Arc::new(PostgresArtifactRepository::new(pool.clone())),
        Arc::new(FilesystemModelFileStore::new(ProjectStorage::open(
            &config.storage.artifact_root,
        )?)),
        Arc::clone(&clock),
    );
    let notifier: Arc<dyn ModelReadyNotifier> = config.webhook.clone().map_or_else(
        || Arc::new(NoopModelReadyNotifier) as Arc<dyn ModelReadyNotifier>,
        |settings| Arc::new(WebhookModelReadyNotifier::new(settings)),
    );
    let disabled = Arc::new(SubmissionDisabled);

    let orchestrator = TrainingOrchestrator::new(
        Arc::new(PostgresTrainingJobRepository::new(pool)),
        Arc::new(HttpTrainingHost::new(config.host.clone())?),
        TrainingCollaborators {
            snapshots: disabled.clone(),
            payloads: disabled,
            artifacts: Arc::new(artifacts),
            notifier,
        },
        clock,
    )
    .with_default_image(config.host.default_image.clone());
    let poller = TrainingPoller::new(Arc::new(orchestrator), config.poller);

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, stopping"),
            Err(err) => error!(error = %err, "failed to listen for interrupt, stopping"),
        }
        if stop.send(true).is_err() {
            debug!("poller already stopped");
        }
    });

    info!(
        artifact_root = %config.storage.artifact_root,
        webhook = config.webhook.is_some(),
        "trainyard daemon started"
    );
    poller.run(shutdown).await;
    Ok(())
}
