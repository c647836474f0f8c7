//! Then steps for training lifecycle BDD scenarios.

use super::world::{TrainingWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::then;
use trainyard::backup::services::BackupServiceError;
use trainyard::config::ConfigError;
use trainyard::training::{
    domain::{RemoteJobId, TrainingStatus},
    ports::{TrainingJobRepository, TrainingJobRepositoryError},
    services::TrainingServiceError,
};

#[then("the submission fails with a missing image error")]
fn fails_with_missing_image(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let result = world
        .submission
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing submission result"))?;
    if !matches!(
        result,
        Err(TrainingServiceError::Config(ConfigError::MissingImage))
    ) {
        return Err(eyre::eyre!("expected MissingImage error, got {result:?}"));
    }
    Ok(())
}

#[then("the submission fails with a duplicate remote job error")]
fn fails_with_duplicate_remote_job(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let result = world
        .submission
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing submission result"))?;
    if !matches!(
        result,
        Err(TrainingServiceError::Repository(
            TrainingJobRepositoryError::DuplicateRemoteJob(_)
        ))
    ) {
        return Err(eyre::eyre!(
            "expected DuplicateRemoteJob error, got {result:?}"
        ));
    }
    Ok(())
}

#[then("no backup exists for the project")]
fn no_backup(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let backups = run_async(world.backups.list(world.project()?)).wrap_err("list backups")?;
    if !backups.is_empty() {
        return Err(eyre::eyre!("expected no backups, found {}", backups.len()));
    }
    Ok(())
}

#[then("no training job exists for the project")]
fn no_training_job(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let jobs = run_async(world.jobs.list_for_project(world.project()?)).wrap_err("list jobs")?;
    if !jobs.is_empty() {
        return Err(eyre::eyre!("expected no jobs, found {}", jobs.len()));
    }
    Ok(())
}

#[then("the training host received no calls")]
fn host_received_no_calls(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let calls = world.host.remote_calls();
    if calls != 0 {
        return Err(eyre::eyre!("expected no host calls, found {calls}"));
    }
    Ok(())
}

#[then(r#"the host received exactly one cancel for job "{job_id}""#)]
fn host_received_one_cancel(world: &TrainingWorld, job_id: String) -> Result<(), eyre::Report> {
    let expected = RemoteJobId::new(job_id).wrap_err("parse remote job id")?;
    let host = world
        .target_host
        .clone()
        .ok_or_else(|| eyre::eyre!("missing submission host"))?;
    let cancels = world.host.cancels();
    if cancels != vec![(host, expected)] {
        return Err(eyre::eyre!("unexpected cancels: {cancels:?}"));
    }
    Ok(())
}

#[then(r#"the job status is "{status}""#)]
fn job_status_is(world: &TrainingWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TrainingStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let job_id = world
        .job
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing submitted job"))?
        .id();
    let stored = run_async(world.jobs.find_by_id(job_id))
        .wrap_err("load job")?
        .ok_or_else(|| eyre::eyre!("job {job_id} disappeared"))?;
    if stored.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            stored.status()
        ));
    }
    Ok(())
}

#[then("the project has {count:usize} model artifacts")]
fn project_has_artifacts(world: &TrainingWorld, count: usize) -> Result<(), eyre::Report> {
    let artifacts = run_async(world.artifacts.list_for_project(world.project()?))
        .wrap_err("list artifacts")?;
    if artifacts.len() != count {
        return Err(eyre::eyre!(
            "expected {count} artifacts, found {}",
            artifacts.len()
        ));
    }
    Ok(())
}

#[then("a model-ready notification was sent")]
fn notification_sent(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let notifications = world.notifier.notifications();
    if notifications.len() != 1 {
        return Err(eyre::eyre!(
            "expected one notification, found {notifications:?}"
        ));
    }
    Ok(())
}

#[then("only the second artifact is deployed")]
fn only_second_deployed(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let deployment = world
        .deployment
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing deployment result"))?;
    if let Err(err) = deployment {
        return Err(eyre::eyre!("deployment failed: {err}"));
    }
    let second = world
        .captured
        .get(1)
        .ok_or_else(|| eyre::eyre!("missing second artifact"))?
        .id();
    let deployed: Vec<_> = run_async(world.artifacts.list_for_project(world.project()?))
        .wrap_err("list artifacts")?
        .into_iter()
        .filter(|artifact| artifact.is_deployed())
        .map(|artifact| artifact.id())
        .collect();
    if deployed != vec![second] {
        return Err(eyre::eyre!("expected only {second} deployed, found {deployed:?}"));
    }
    Ok(())
}

#[then("the current pointer resolves to the second artifact")]
fn current_pointer_is_second(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let second = world
        .captured
        .get(1)
        .ok_or_else(|| eyre::eyre!("missing second artifact"))?;
    let current = run_async(world.artifacts.current_path(world.project()?))
        .wrap_err("resolve current pointer")?
        .ok_or_else(|| eyre::eyre!("current pointer missing"))?;
    if current.as_path() != second.storage_path() {
        return Err(eyre::eyre!(
            "current pointer resolves to {current}, expected {}",
            second.storage_path()
        ));
    }
    Ok(())
}

#[then("the checkout fails with a not found error")]
fn checkout_not_found(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let result = world
        .checkout
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing checkout result"))?;
    if !matches!(result, Err(BackupServiceError::NotFound { .. })) {
        return Err(eyre::eyre!("expected NotFound error, got {result:?}"));
    }
    Ok(())
}

#[then("no import was performed")]
fn no_import(world: &TrainingWorld) -> Result<(), eyre::Report> {
    let imports = world.archiver.imports().wrap_err("read recorded imports")?;
    if !imports.is_empty() {
        return Err(eyre::eyre!("expected no imports, found {}", imports.len()));
    }
    Ok(())
}
