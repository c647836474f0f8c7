//! When steps for training lifecycle BDD scenarios.

use super::world::{TrainingWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use trainyard::backup::domain::BackupId;
use trainyard::training::domain::{HostUrl, TrainingOptions};

#[when(r#"training is submitted to host "{host}""#)]
fn submit_training(world: &mut TrainingWorld, host: String) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    let target = HostUrl::new(host).wrap_err("parse host")?;
    let result = run_async(
        world
            .orchestrator()
            .submit(&project_id, &target, &TrainingOptions::new()),
    );
    if let Ok(ref job) = result {
        world.job = Some(job.clone());
    }
    world.target_host = Some(target);
    world.submission = Some(result);
    Ok(())
}

#[when("the job is reconciled")]
fn reconcile_job(world: &mut TrainingWorld) -> Result<(), eyre::Report> {
    let job_id = world
        .job
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing submitted job"))?
        .id();
    run_async(world.orchestrator().reconcile(job_id)).wrap_err("reconcile job")?;
    Ok(())
}

#[when("the second artifact is deployed")]
fn deploy_second(world: &mut TrainingWorld) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    let second = world
        .captured
        .get(1)
        .ok_or_else(|| eyre::eyre!("missing second artifact"))?
        .id();
    world.deployment = Some(run_async(world.artifacts.deploy(
        &project_id,
        second,
        Some("operator".to_owned()),
    )));
    Ok(())
}

#[when("an unknown backup is checked out")]
fn checkout_unknown(world: &mut TrainingWorld) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    world.checkout = Some(run_async(
        world.backups.checkout(&project_id, BackupId::new()),
    ));
    Ok(())
}
