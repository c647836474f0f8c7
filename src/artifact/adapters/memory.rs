//! In-memory artifact repository for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::artifact::{
    domain::{ArtifactId, ModelArtifact},
    ports::{ArtifactRepository, ArtifactRepositoryError, ArtifactRepositoryResult},
};
use crate::project::ProjectId;

/// Thread-safe in-memory artifact repository.
///
/// Deploy flag changes happen under a single write lock, so readers never see
/// two deployed artifacts for one project.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactRepository {
    state: Arc<RwLock<HashMap<ArtifactId, ModelArtifact>>>,
}

impl InMemoryArtifactRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ArtifactRepositoryResult<RwLockReadGuard<'_, HashMap<ArtifactId, ModelArtifact>>> {
        self.state.read().map_err(|err| {
            ArtifactRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> ArtifactRepositoryResult<RwLockWriteGuard<'_, HashMap<ArtifactId, ModelArtifact>>> {
        self.state.write().map_err(|err| {
            ArtifactRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn store(&self, artifact: &ModelArtifact) -> ArtifactRepositoryResult<()> {
        let mut state = self.write()?;
        if state.contains_key(&artifact.id()) {
            return Err(ArtifactRepositoryError::DuplicateArtifact(artifact.id()));
        }
        state.insert(artifact.id(), artifact.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>> {
        let state = self.read()?;
        Ok(state
            .get(&id)
            .filter(|artifact| artifact.project_id() == project_id)
            .cloned())
    }

    async fn list_for_project(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactRepositoryResult<Vec<ModelArtifact>> {
        let state = self.read()?;
        let mut artifacts: Vec<ModelArtifact> = state
            .values()
            .filter(|artifact| artifact.project_id() == project_id)
            .cloned()
            .collect();
        artifacts.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(artifacts)
    }

    async fn find_deployed(
        &self,
        project_id: &ProjectId,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>> {
        let state = self.read()?;
        Ok(state
            .values()
            .find(|artifact| artifact.project_id() == project_id && artifact.is_deployed())
            .cloned())
    }

    async fn set_deployed(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
        deployed_by: Option<String>,
        at: DateTime<Utc>,
    ) -> ArtifactRepositoryResult<ModelArtifact> {
        let mut state = self.write()?;
        let belongs = state
            .get(&id)
            .is_some_and(|artifact| artifact.project_id() == project_id);
        if !belongs {
            return Err(ArtifactRepositoryError::NotFound(id));
        }
        for artifact in state
            .values_mut()
            .filter(|artifact| artifact.project_id() == project_id)
        {
            artifact.deactivate();
        }
        let target = state
            .get_mut(&id)
            .ok_or(ArtifactRepositoryError::NotFound(id))?;
        target.activate(deployed_by, at);
        Ok(target.clone())
    }

    async fn clear_deployed(&self, project_id: &ProjectId) -> ArtifactRepositoryResult<()> {
        let mut state = self.write()?;
        for artifact in state
            .values_mut()
            .filter(|artifact| artifact.project_id() == project_id)
        {
            artifact.deactivate();
        }
        Ok(())
    }

    async fn update_comment(
        &self,
        project_id: &ProjectId,
        id: ArtifactId,
        comment: Option<String>,
    ) -> ArtifactRepositoryResult<Option<ModelArtifact>> {
        let mut state = self.write()?;
        let Some(artifact) = state
            .get_mut(&id)
            .filter(|artifact| artifact.project_id() == project_id)
        else {
            return Ok(None);
        };
        artifact.set_comment(comment);
        Ok(Some(artifact.clone()))
    }
}
