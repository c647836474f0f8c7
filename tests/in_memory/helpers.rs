//! Shared wiring for in-memory lifecycle integration tests.

use std::sync::Arc;

use bytes::Bytes;
use camino::Utf8PathBuf;
use mockable::DefaultClock;
use rstest::fixture;
use tempfile::TempDir;
use trainyard::artifact::{
    adapters::{filesystem::FilesystemModelFileStore, memory::InMemoryArtifactRepository},
    services::ArtifactStoreService,
};
use trainyard::backup::{
    adapters::memory::{
        InMemoryBackupArchiveStore, InMemoryBackupRepository, InMemoryProjectArchiver,
    },
    services::BackupService,
};
use trainyard::project::ProjectId;
use trainyard::storage::{ByteStream, ProjectStorage};
use trainyard::training::{
    adapters::memory::{
        InMemoryTrainingJobRepository, RecordingModelReadyNotifier, ScriptedTrainingHost,
        StaticPayloadSource,
    },
    domain::{HostUrl, TrainingJob, TrainingOptions},
    services::{TrainingCollaborators, TrainingOrchestrator},
};

/// Backup service over in-memory adapters.
pub type TestBackupService = BackupService<
    InMemoryBackupRepository,
    InMemoryBackupArchiveStore,
    InMemoryProjectArchiver,
    DefaultClock,
>;

/// Artifact service over a temporary filesystem root.
pub type TestArtifactService =
    ArtifactStoreService<InMemoryArtifactRepository, FilesystemModelFileStore, DefaultClock>;

/// Orchestrator over in-memory adapters and a scripted host.
pub type TestOrchestrator =
    TrainingOrchestrator<InMemoryTrainingJobRepository, ScriptedTrainingHost, DefaultClock>;

/// Fully wired lifecycle for one project.
pub struct Stack {
    _temp: TempDir,
    pub backups: Arc<TestBackupService>,
    pub artifacts: Arc<TestArtifactService>,
    pub files: Arc<FilesystemModelFileStore>,
    pub jobs: Arc<InMemoryTrainingJobRepository>,
    pub host: Arc<ScriptedTrainingHost>,
    pub notifier: Arc<RecordingModelReadyNotifier>,
    pub orchestrator: Arc<TestOrchestrator>,
    pub project: ProjectId,
    pub target: HostUrl,
}

impl Stack {
    /// Submits a training run with default options.
    ///
    /// # Errors
    ///
    /// Returns an error when submission fails.
    pub async fn submit(&self) -> eyre::Result<TrainingJob> {
        Ok(self
            .orchestrator
            .submit(&self.project, &self.target, &TrainingOptions::new())
            .await?)
    }
}

/// Provides a freshly wired lifecycle with a seeded project export.
#[fixture]
pub fn stack() -> Stack {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
    let clock = Arc::new(DefaultClock);
    let project = ProjectId::new("bf").expect("valid project");

    let archiver = Arc::new(InMemoryProjectArchiver::new());
    archiver
        .set_contents(&project, Bytes::from_static(b"{\"stories\":[]}"))
        .expect("seed project export");
    let backups = Arc::new(BackupService::new(
        Arc::new(InMemoryBackupRepository::new()),
        Arc::new(InMemoryBackupArchiveStore::new()),
        archiver,
        Arc::clone(&clock),
    ));

    let files = Arc::new(FilesystemModelFileStore::new(
        ProjectStorage::open(root.join("models")).expect("artifact root opens"),
    ));
    let artifacts = Arc::new(ArtifactStoreService::new(
        Arc::new(InMemoryArtifactRepository::new()),
        Arc::clone(&files),
        Arc::clone(&clock),
    ));

    let jobs = Arc::new(InMemoryTrainingJobRepository::new());
    let host = Arc::new(ScriptedTrainingHost::new());
    let notifier = Arc::new(RecordingModelReadyNotifier::new());
    let orchestrator = Arc::new(
        TrainingOrchestrator::new(
            Arc::clone(&jobs),
            Arc::clone(&host),
            TrainingCollaborators {
                snapshots: backups.clone(),
                payloads: Arc::new(StaticPayloadSource::default()),
                artifacts: artifacts.clone(),
                notifier: notifier.clone(),
            },
            clock,
        )
        .with_default_image(Some("trainer:latest".to_owned())),
    );

    Stack {
        _temp: temp,
        backups,
        artifacts,
        files,
        jobs,
        host,
        notifier,
        orchestrator,
        project,
        target: HostUrl::new("http://trainer:5000").expect("valid host"),
    }
}

/// Wraps fixed contents as a single-chunk byte stream.
#[must_use]
pub fn byte_stream(contents: Vec<u8>) -> ByteStream {
    Box::pin(futures::stream::iter(vec![Ok(Bytes::from(contents))]))
}
