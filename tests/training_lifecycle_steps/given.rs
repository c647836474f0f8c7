//! Given steps for training lifecycle BDD scenarios.

use super::world::{TrainingWorld, run_async};
use bytes::Bytes;
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use trainyard::backup::domain::BackupId;
use trainyard::project::ProjectId;
use trainyard::storage::ByteStream;
use trainyard::training::{
    domain::{HostUrl, NewTrainingJob, RemoteJobId, TrainingJob, TrainingOptions, TrainingStatus},
    ports::TrainingJobRepository,
};

fn model_stream(contents: &'static [u8]) -> ByteStream {
    Box::pin(futures::stream::iter(vec![Ok(Bytes::from_static(contents))]))
}

#[given(r#"a project "{project}" with exported data"#)]
fn project_with_data(world: &mut TrainingWorld, project: String) -> Result<(), eyre::Report> {
    let project_id = ProjectId::new(project).wrap_err("parse scenario project")?;
    world
        .archiver
        .set_contents(&project_id, Bytes::from_static(b"{\"stories\":[]}"))
        .wrap_err("seed project export")?;
    world.project = Some(project_id);
    Ok(())
}

#[given("no default container image is configured")]
fn no_default_image(world: &mut TrainingWorld) {
    world.default_image = None;
}

#[given(r#"the default container image "{image}""#)]
fn default_image(world: &mut TrainingWorld, image: String) {
    world.default_image = Some(image);
}

#[given(r#"the host assigns job id "{job_id}""#)]
fn host_assigns(world: &mut TrainingWorld, job_id: String) -> Result<(), eyre::Report> {
    let remote = RemoteJobId::new(job_id).wrap_err("parse remote job id")?;
    world.host.assign_job_ids([remote]);
    Ok(())
}

#[given(r#"job "{job_id}" is already registered on host "{host}""#)]
fn job_already_registered(
    world: &mut TrainingWorld,
    job_id: String,
    host: String,
) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    let existing = TrainingJob::new(
        NewTrainingJob {
            remote_job_id: RemoteJobId::new(job_id).wrap_err("parse remote job id")?,
            project_id,
            host: HostUrl::new(host).wrap_err("parse host")?,
            name: None,
            backup_id: BackupId::new(),
        },
        &DefaultClock,
    );
    run_async(world.jobs.insert(&existing)).wrap_err("register existing job")?;
    Ok(())
}

#[given(r#"the host reports statuses "{statuses}" for job "{job_id}""#)]
fn host_reports_statuses(
    world: &mut TrainingWorld,
    statuses: String,
    job_id: String,
) -> Result<(), eyre::Report> {
    let remote = RemoteJobId::new(job_id).wrap_err("parse remote job id")?;
    let script = statuses
        .split(',')
        .map(|raw| TrainingStatus::try_from(raw.trim()))
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("parse scripted statuses")?;
    world.host.script_statuses(&remote, script);
    Ok(())
}

#[given(r#"job "{job_id}" produces a model"#)]
fn job_produces_model(world: &mut TrainingWorld, job_id: String) -> Result<(), eyre::Report> {
    let remote = RemoteJobId::new(job_id).wrap_err("parse remote job id")?;
    world
        .host
        .set_result(&remote, Bytes::from_static(b"trained model"));
    Ok(())
}

#[given(r#"training was submitted to host "{host}""#)]
fn training_was_submitted(world: &mut TrainingWorld, host: String) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    let target = HostUrl::new(host).wrap_err("parse host")?;
    let job = run_async(
        world
            .orchestrator()
            .submit(&project_id, &target, &TrainingOptions::new()),
    )
    .wrap_err("submit training in scenario setup")?;
    world.job = Some(job);
    Ok(())
}

#[given("two captured model artifacts")]
fn two_captured_artifacts(world: &mut TrainingWorld) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    for contents in [b"first model".as_slice(), b"second model".as_slice()] {
        let artifact = run_async(world.artifacts.save(
            &project_id,
            model_stream(contents),
            None,
        ))
        .wrap_err("capture artifact in scenario setup")?;
        world.captured.push(artifact);
    }
    Ok(())
}

#[given("the first artifact is deployed")]
fn first_artifact_deployed(world: &mut TrainingWorld) -> Result<(), eyre::Report> {
    let project_id = world.project()?.clone();
    let first = world
        .captured
        .first()
        .ok_or_else(|| eyre::eyre!("missing captured artifacts"))?
        .id();
    run_async(world.artifacts.deploy(&project_id, first, Some("operator".to_owned())))
        .wrap_err("deploy first artifact")?;
    Ok(())
}
