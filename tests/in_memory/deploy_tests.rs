//! Deploy exclusivity across concurrent callers.

use super::helpers::{Stack, byte_stream, stack};
use futures::future::join_all;
use rstest::rstest;
use std::sync::Arc;
use trainyard::artifact::domain::ModelArtifact;

async fn capture(stack: &Stack, count: u8) -> Vec<ModelArtifact> {
    let mut captured = Vec::new();
    for index in 0..count {
        let artifact = stack
            .artifacts
            .save(&stack.project, byte_stream(vec![index; 64]), None)
            .await
            .expect("capture succeeds");
        captured.push(artifact);
    }
    captured
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_deploys_leave_one_active_artifact(stack: Stack) {
    let captured = capture(&stack, 6).await;
    let stack = Arc::new(stack);

    let handles = captured.iter().map(|artifact| {
        let shared = Arc::clone(&stack);
        let artifact_id = artifact.id();
        tokio::spawn(async move {
            shared
                .artifacts
                .deploy(&shared.project, artifact_id, Some("ops".to_owned()))
                .await
        })
    });
    for joined in join_all(handles).await {
        joined.expect("task joins").expect("deploy succeeds");
    }

    let listed = stack
        .artifacts
        .list_for_project(&stack.project)
        .await
        .expect("listing succeeds");
    let deployed: Vec<_> = listed.iter().filter(|artifact| artifact.is_deployed()).collect();
    assert_eq!(deployed.len(), 1);

    let current = stack
        .artifacts
        .current_path(&stack.project)
        .await
        .expect("pointer resolves")
        .expect("pointer exists");
    assert_eq!(
        deployed.first().map(|artifact| artifact.storage_path()),
        Some(current.as_path())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redeploying_the_active_artifact_keeps_it_active(stack: Stack) {
    let captured = capture(&stack, 2).await;
    let second = captured.get(1).expect("second artifact");

    for _ in 0..2 {
        stack
            .artifacts
            .deploy(&stack.project, second.id(), None)
            .await
            .expect("deploy succeeds");
    }

    let active = stack
        .artifacts
        .deployed_for_project(&stack.project)
        .await
        .expect("lookup succeeds")
        .expect("an artifact is deployed");
    assert_eq!(active.id(), second.id());
}
