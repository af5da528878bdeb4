//! ControllerHandle integration tests.
//!
//! Many tasks share one controller through a handle; the mutex serializes
//! them so every accepted transition still produces exactly one record.

use orchestrator::{Context, ControllerHandle, WorkflowState};

use crate::fixtures::{ctx, TestDir};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_drivers_are_serialized() {
    let dir = TestDir::new();
    let handle = ControllerHandle::new(dir.controller());

    // Every task tries the same first transition; exactly one may win.
    let mut tasks = Vec::new();
    for i in 0..8i64 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .transition(
                    WorkflowState::ValidatingRequest,
                    ctx([("winner", i.into())]),
                )
                .await
                .is_ok()
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(handle.summary().history_length, 1);
    assert_eq!(dir.checkpoint_files().len(), 1);
}

#[tokio::test]
async fn test_handle_resume_and_load() {
    let dir = TestDir::new();
    let handle = ControllerHandle::new(dir.controller());
    handle
        .transition(WorkflowState::ValidatingRequest, Context::new())
        .await
        .unwrap();
    let first = handle.summary().last_checkpoint.unwrap();
    handle
        .transition(WorkflowState::LoadingSpecs, Context::new())
        .await
        .unwrap();

    let restarted = ControllerHandle::new(dir.controller());
    assert!(restarted.resume_latest().await.unwrap());
    assert_eq!(restarted.state(), WorkflowState::LoadingSpecs);

    restarted.load_checkpoint(first).await.unwrap();
    assert_eq!(restarted.state(), WorkflowState::ValidatingRequest);
    assert_eq!(restarted.export_history().len(), 1);

    restarted.reset();
    assert_eq!(restarted.summary().history_length, 0);
}
