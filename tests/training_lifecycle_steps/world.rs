//! Shared world state for training lifecycle BDD scenarios.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mockable::DefaultClock;
use rstest::fixture;
use tempfile::TempDir;
use trainyard::artifact::{
    adapters::{filesystem::FilesystemModelFileStore, memory::InMemoryArtifactRepository},
    domain::ModelArtifact,
    services::{ArtifactStoreService, DeployedArtifact, ArtifactStoreResult},
};
use trainyard::backup::{
    adapters::memory::{
        InMemoryBackupArchiveStore, InMemoryBackupRepository, InMemoryProjectArchiver,
    },
    ports::ImportSummary,
    services::{BackupService, BackupServiceResult},
};
use trainyard::project::ProjectId;
use trainyard::storage::ProjectStorage;
use trainyard::training::{
    adapters::memory::{
        InMemoryTrainingJobRepository, RecordingModelReadyNotifier, ScriptedTrainingHost,
        StaticPayloadSource,
    },
    domain::{HostUrl, TrainingJob},
    services::{TrainingCollaborators, TrainingOrchestrator, TrainingServiceResult},
};

/// Backup service type used by the BDD world.
pub type TestBackupService = BackupService<
    InMemoryBackupRepository,
    InMemoryBackupArchiveStore,
    InMemoryProjectArchiver,
    DefaultClock,
>;

/// Artifact service type used by the BDD world.
pub type TestArtifactService =
    ArtifactStoreService<InMemoryArtifactRepository, FilesystemModelFileStore, DefaultClock>;

/// Orchestrator type used by the BDD world.
pub type TestOrchestrator =
    TrainingOrchestrator<InMemoryTrainingJobRepository, ScriptedTrainingHost, DefaultClock>;

/// Scenario world for training lifecycle behaviour tests.
pub struct TrainingWorld {
    _temp: TempDir,
    pub archiver: Arc<InMemoryProjectArchiver>,
    pub backups: Arc<TestBackupService>,
    pub artifacts: Arc<TestArtifactService>,
    pub jobs: Arc<InMemoryTrainingJobRepository>,
    pub host: Arc<ScriptedTrainingHost>,
    pub notifier: Arc<RecordingModelReadyNotifier>,
    pub default_image: Option<String>,
    pub project: Option<ProjectId>,
    pub target_host: Option<HostUrl>,
    pub submission: Option<TrainingServiceResult<TrainingJob>>,
    pub job: Option<TrainingJob>,
    pub captured: Vec<ModelArtifact>,
    pub deployment: Option<ArtifactStoreResult<DeployedArtifact>>,
    pub checkout: Option<BackupServiceResult<ImportSummary>>,
}

impl TrainingWorld {
    /// Creates a world backed by in-memory registries and a temporary
    /// artifact root.
    ///
    /// # Panics
    ///
    /// Panics when the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
        let storage = ProjectStorage::open(root.join("models")).expect("artifact root opens");
        let clock = Arc::new(DefaultClock);
        let archiver = Arc::new(InMemoryProjectArchiver::new());

        Self {
            _temp: temp,
            backups: Arc::new(BackupService::new(
                Arc::new(InMemoryBackupRepository::new()),
                Arc::new(InMemoryBackupArchiveStore::new()),
                Arc::clone(&archiver),
                Arc::clone(&clock),
            )),
            artifacts: Arc::new(ArtifactStoreService::new(
                Arc::new(InMemoryArtifactRepository::new()),
                Arc::new(FilesystemModelFileStore::new(storage)),
                clock,
            )),
            archiver,
            jobs: Arc::new(InMemoryTrainingJobRepository::new()),
            host: Arc::new(ScriptedTrainingHost::new()),
            notifier: Arc::new(RecordingModelReadyNotifier::new()),
            default_image: None,
            project: None,
            target_host: None,
            submission: None,
            job: None,
            captured: Vec::new(),
            deployment: None,
            checkout: None,
        }
    }

    /// Builds an orchestrator over the world's collaborators.
    #[must_use]
    pub fn orchestrator(&self) -> TestOrchestrator {
        TrainingOrchestrator::new(
            Arc::clone(&self.jobs),
            Arc::clone(&self.host),
            TrainingCollaborators {
                snapshots: self.backups.clone(),
                payloads: Arc::new(StaticPayloadSource::default()),
                artifacts: self.artifacts.clone(),
                notifier: self.notifier.clone(),
            },
            Arc::new(DefaultClock),
        )
        .with_default_image(self.default_image.clone())
    }

    /// Returns the scenario project.
    ///
    /// # Errors
    ///
    /// Returns an error when no project step has run.
    pub fn project(&self) -> Result<&ProjectId, eyre::Report> {
        self.project
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing project in scenario world"))
    }
}

impl Default for TrainingWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TrainingWorld {
    TrainingWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
