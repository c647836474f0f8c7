//! Binds the backup and artifact services to the training collaborator
//! ports.

use crate::artifact::{
    domain::ModelArtifact,
    ports::{ArtifactRepository, ModelFileStore},
    services::ArtifactStoreService,
};
use crate::backup::{
    domain::BackupId,
    ports::{BackupArchiveStore, BackupRepository, ProjectArchiver},
    services::BackupService,
};
use crate::project::ProjectId;
use crate::storage::ByteStream;
use crate::training::ports::{ArtifactCapture, CollaboratorError, CollaboratorResult, PreTrainingSnapshot};
use async_trait::async_trait;
use mockable::Clock;

#[async_trait]
impl<R, S, A, C> PreTrainingSnapshot for BackupService<R, S, A, C>
where
    R: BackupRepository,
    S: BackupArchiveStore,
    A: ProjectArchiver,
    C: Clock + Send + Sync,
{
    async fn snapshot(
        &self,
        project_id: &ProjectId,
        comment: Option<String>,
    ) -> CollaboratorResult<BackupId> {
        self.create(project_id, comment)
            .await
            .map(|backup| backup.id())
            .map_err(CollaboratorError::backup)
    }
}

#[async_trait]
impl<R, F, C> ArtifactCapture for ArtifactStoreService<R, F, C>
where
    R: ArtifactRepository,
    F: ModelFileStore,
    C: Clock + Send + Sync,
{
    async fn capture(
        &self,
        project_id: &ProjectId,
        result: ByteStream,
        name: Option<String>,
    ) -> CollaboratorResult<ModelArtifact> {
        self.save(project_id, result, name)
            .await
            .map_err(CollaboratorError::artifact)
    }
}
