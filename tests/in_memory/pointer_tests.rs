//! Pointer reads racing pointer publication.

use super::helpers::{Stack, byte_stream, stack};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use trainyard::artifact::{domain::ModelPointer, ports::ModelFileStore};

const CAPTURES: u8 = 12;
const MODEL_SIZE: usize = 4096;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn readers_never_observe_a_missing_or_partial_model(stack: Stack) {
    let first = stack
        .artifacts
        .save(&stack.project, byte_stream(vec![0; MODEL_SIZE]), None)
        .await
        .expect("first capture succeeds");
    stack
        .artifacts
        .deploy(&stack.project, first.id(), None)
        .await
        .expect("first deploy succeeds");

    let stack = Arc::new(stack);
    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let shared = Arc::clone(&stack);
        let finished = Arc::clone(&done);
        tokio::spawn(async move {
            let mut reads = 0_usize;
            while !finished.load(Ordering::Acquire) {
                for pointer in [ModelPointer::Latest, ModelPointer::Current] {
                    let path = shared
                        .files
                        .resolve(&shared.project, pointer)
                        .await
                        .expect("pointer reads")
                        .expect("pointer stays published");
                    let contents = tokio::fs::read(path.as_std_path())
                        .await
                        .expect("pointer target is readable");
                    assert_eq!(contents.len(), MODEL_SIZE);
                    reads += 1;
                }
                tokio::task::yield_now().await;
            }
            reads
        })
    };

    for index in 1..=CAPTURES {
        let artifact = stack
            .artifacts
            .save(&stack.project, byte_stream(vec![index; MODEL_SIZE]), None)
            .await
            .expect("capture succeeds");
        stack
            .artifacts
            .deploy(&stack.project, artifact.id(), None)
            .await
            .expect("deploy succeeds");
    }
    done.store(true, Ordering::Release);

    let reads = reader.await.expect("reader joins");
    assert!(reads > 0);
    let current = stack
        .artifacts
        .current_path(&stack.project)
        .await
        .expect("pointer resolves")
        .expect("pointer exists");
    let contents = tokio::fs::read(current.as_std_path())
        .await
        .expect("current model is readable");
    assert_eq!(contents.first(), Some(&CAPTURES));
}
