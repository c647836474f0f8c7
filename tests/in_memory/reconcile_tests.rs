//! Reconcile behaviour across the wired lifecycle.

use super::helpers::{Stack, stack};
use bytes::Bytes;
use rstest::rstest;
use trainyard::backup::domain::Backup;
use trainyard::config::PollerSettings;
use trainyard::training::{
    domain::{TrainingJobId, TrainingStatus},
    ports::TrainingJobRepository,
    services::{CancelOutcome, ReconcileOutcome, TrainingPoller, TrainingServiceError},
};

async fn stored_status(stack: &Stack, job_id: TrainingJobId) -> TrainingStatus {
    stack
        .jobs
        .find_by_id(job_id)
        .await
        .expect("lookup succeeds")
        .expect("job exists")
        .status()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submission_records_the_backup_it_took(stack: Stack) {
    let job = stack.submit().await.expect("submission succeeds");

    let backups = stack.backups.list(&stack.project).await.expect("listing succeeds");

    assert_eq!(backups.len(), 1);
    assert_eq!(
        backups.first().map(Backup::id),
        Some(job.backup_id())
    );
}

#[rstest]
#[case(TrainingStatus::Failed)]
#[case(TrainingStatus::Success)]
#[tokio::test(flavor = "multi_thread")]
async fn terminal_status_survives_later_polls(stack: Stack, #[case] terminal: TrainingStatus) {
    let job = stack.submit().await.expect("submission succeeds");
    stack.host.script_statuses(
        job.remote_job_id(),
        [terminal, TrainingStatus::Training, TrainingStatus::Cancelled],
    );
    stack
        .host
        .set_result(job.remote_job_id(), Bytes::from_static(b"model"));
    stack
        .orchestrator
        .reconcile(job.id())
        .await
        .expect("first pass succeeds");

    for _ in 0..3 {
        let outcome = stack
            .orchestrator
            .reconcile(job.id())
            .await
            .expect("later pass succeeds");
        assert_eq!(outcome, ReconcileOutcome::AlreadyTerminal(terminal));
    }
    assert_eq!(stored_status(&stack, job.id()).await, terminal);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_job_is_never_revived(stack: Stack) {
    let job = stack.submit().await.expect("submission succeeds");
    let outcome = stack
        .orchestrator
        .cancel(job.remote_job_id())
        .await
        .expect("cancel succeeds");
    assert_eq!(outcome, CancelOutcome::Cancelled);
    stack
        .host
        .script_statuses(job.remote_job_id(), [TrainingStatus::Training]);

    let reconciled = stack
        .orchestrator
        .reconcile(job.id())
        .await
        .expect("reconcile succeeds");

    assert_eq!(
        reconciled,
        ReconcileOutcome::AlreadyTerminal(TrainingStatus::Cancelled)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn crash_before_commit_leaves_job_retryable(stack: Stack) {
    let job = stack.submit().await.expect("submission succeeds");
    stack
        .host
        .script_statuses(job.remote_job_id(), [TrainingStatus::Success]);
    stack
        .host
        .set_result(job.remote_job_id(), Bytes::from_static(b"model"));
    stack.jobs.fail_updates(true).expect("toggle failure");

    let interrupted = stack.orchestrator.reconcile(job.id()).await;

    assert!(matches!(interrupted, Err(TrainingServiceError::Repository(_))));
    assert_eq!(stored_status(&stack, job.id()).await, TrainingStatus::Training);
    assert!(stack.notifier.notifications().is_empty());

    stack.jobs.fail_updates(false).expect("toggle failure");
    let retried = stack
        .orchestrator
        .reconcile(job.id())
        .await
        .expect("retry succeeds");

    assert_eq!(retried, ReconcileOutcome::Updated(TrainingStatus::Success));
    let artifacts = stack
        .artifacts
        .list_for_project(&stack.project)
        .await
        .expect("listing succeeds");
    assert!(!artifacts.is_empty());
    for artifact in &artifacts {
        assert!(artifact.storage_path().exists());
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn poller_drives_a_job_to_success(stack: Stack) {
    let job = stack.submit().await.expect("submission succeeds");
    stack.host.script_statuses(
        job.remote_job_id(),
        [
            TrainingStatus::Training,
            TrainingStatus::Training,
            TrainingStatus::Success,
        ],
    );
    stack
        .host
        .set_result(job.remote_job_id(), Bytes::from_static(b"trained model"));
    let poller = TrainingPoller::new(stack.orchestrator.clone(), PollerSettings::default());

    let first = poller.poll_once().await.expect("first pass");
    let second = poller.poll_once().await.expect("second pass");
    assert_eq!((first.updated, second.updated), (0, 0));
    assert_eq!(stored_status(&stack, job.id()).await, TrainingStatus::Training);

    let third = poller.poll_once().await.expect("third pass");
    let fourth = poller.poll_once().await.expect("fourth pass");

    assert_eq!(third.updated, 1);
    assert_eq!(fourth.examined, 0);
    assert_eq!(stored_status(&stack, job.id()).await, TrainingStatus::Success);
    let artifacts = stack
        .artifacts
        .list_for_project(&stack.project)
        .await
        .expect("listing succeeds");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(stack.notifier.notifications().len(), 1);
}
