//! Checkpoint recovery integration tests.
//!
//! These tests verify that a brand-new controller over the same directory
//! can pick up exactly where an earlier one left off, and that bad files
//! are refused without disturbing the live controller.

use std::fs;

use orchestrator::{ContextValue, Error, WorkflowController, WorkflowState};

use crate::fixtures::{ctx, drive, TestDir, UP_TO_QA};

/// Test: Resume after restart
/// Given a controller that reached RunningQA with specsLoaded = true
/// When a new controller loads the latest checkpoint
/// Then it reports RunningQA and the same context
#[test]
fn test_new_controller_resumes_from_latest() {
    let dir = TestDir::new();
    {
        let mut controller = dir.controller();
        drive(&mut controller, &UP_TO_QA[..4]);
        controller
            .transition(WorkflowState::RunningQA, ctx([("specsLoaded", true.into())]))
            .unwrap();
    }

    let mut restarted = dir.controller();
    let latest = restarted.latest_checkpoint().unwrap().expect("a checkpoint");
    restarted.load_checkpoint(&latest).unwrap();

    assert_eq!(restarted.state(), WorkflowState::RunningQA);
    assert_eq!(
        restarted.context().get("specsLoaded"),
        Some(&ContextValue::Bool(true))
    );
}

/// Test: Round trip
/// Saving a checkpoint and loading it into a fresh controller reproduces
/// state, context and history exactly.
#[test]
fn test_checkpoint_round_trip() {
    let dir = TestDir::new();
    let mut original = dir.controller();
    original
        .transition(
            WorkflowState::ValidatingRequest,
            ctx([("request", ContextValue::from("build a dashboard"))]),
        )
        .unwrap();
    original
        .transition(
            WorkflowState::LoadingSpecs,
            ctx([
                ("spec_count", 3.into()),
                ("coverage", 0.75.into()),
                ("tags", vec!["web", "ui"].into()),
                ("owner", ContextValue::Null),
            ]),
        )
        .unwrap();

    let mut fresh = dir.controller();
    fresh
        .load_checkpoint(original.last_checkpoint().unwrap())
        .unwrap();

    assert_eq!(fresh.state(), original.state());
    assert_eq!(fresh.context(), original.context());
    assert_eq!(fresh.history(), original.history());
    assert_eq!(fresh.last_checkpoint(), original.last_checkpoint());
}

/// Floats whose shortest representation needs all 17 significant digits
/// must come back bit-for-bit.
#[test]
fn test_round_trip_preserves_floats_exactly() {
    let dir = TestDir::new();
    let tiny = 1.0715660391465826e-75_f64;
    let huge = -1.603964615428183e143_f64;
    let mut original = dir.controller();
    original
        .transition(
            WorkflowState::ValidatingRequest,
            ctx([
                ("tiny", tiny.into()),
                ("huge", huge.into()),
                ("scores", vec![tiny, huge].into()),
            ]),
        )
        .unwrap();

    let mut fresh = dir.controller();
    fresh
        .load_checkpoint(original.last_checkpoint().unwrap())
        .unwrap();

    assert_eq!(fresh.context(), original.context());
    match fresh.context().get("tiny") {
        Some(ContextValue::Float(value)) => assert_eq!(value.to_bits(), tiny.to_bits()),
        other => panic!("unexpected value {:?}", other),
    }
    match fresh.context().get("huge") {
        Some(ContextValue::Float(value)) => assert_eq!(value.to_bits(), huge.to_bits()),
        other => panic!("unexpected value {:?}", other),
    }
}

/// Non-finite floats have no JSON form, so they never reach a checkpoint.
#[test]
fn test_non_finite_context_is_rejected() {
    let dir = TestDir::new();
    let mut controller = dir.controller();
    drive(&mut controller, &UP_TO_QA[..1]);
    let files = dir.checkpoint_files();

    let result = controller.transition(
        WorkflowState::LoadingSpecs,
        ctx([("weights", vec![1.0, f64::INFINITY].into())]),
    );

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(controller.state(), WorkflowState::ValidatingRequest);
    assert_eq!(dir.checkpoint_files(), files);
}

#[test]
fn test_resumed_controller_continues_the_run() {
    let dir = TestDir::new();
    {
        let mut controller = dir.controller();
        drive(&mut controller, &UP_TO_QA);
    }

    let mut resumed = dir.controller();
    assert!(resumed.resume_latest().unwrap());
    drive(
        &mut resumed,
        &[WorkflowState::GeneratingSummary, WorkflowState::Completed],
    );

    assert_eq!(resumed.history().len(), 7);
    assert_eq!(dir.checkpoint_files().len(), 7);

    let mut again = dir.controller();
    again.resume_latest().unwrap();
    assert_eq!(again.state(), WorkflowState::Completed);
    assert_eq!(again.history(), resumed.history());
}

#[test]
fn test_resume_with_no_checkpoints() {
    let dir = TestDir::new();
    let mut controller = dir.controller();
    assert!(!controller.resume_latest().unwrap());
    assert_eq!(controller.latest_checkpoint().unwrap(), None);
    assert_eq!(controller.state(), WorkflowState::Idle);
}

#[test]
fn test_load_by_full_path_and_bare_id() {
    let dir = TestDir::new();
    let mut controller = dir.controller();
    drive(&mut controller, &UP_TO_QA[..2]);
    let id = controller.last_checkpoint().unwrap().to_string();
    let name = controller.latest_checkpoint().unwrap().unwrap();
    assert_eq!(name, format!("checkpoint_{}.json", id));

    let moved = dir.temp_dir.path().join("archived.json");
    fs::copy(dir.checkpoints.join(&name), &moved).unwrap();

    let mut by_path = dir.controller();
    by_path.load_checkpoint(moved.to_str().unwrap()).unwrap();
    assert_eq!(by_path.state(), WorkflowState::LoadingSpecs);

    let mut by_id = dir.controller();
    by_id.load_checkpoint(&id).unwrap();
    assert_eq!(by_id.history().len(), 2);
}

#[test]
fn test_bad_checkpoints_leave_controller_untouched() {
    let dir = TestDir::new();
    let mut controller = dir.controller();
    drive(&mut controller, &UP_TO_QA[..3]);
    let before = (
        controller.state(),
        controller.context().clone(),
        controller.export_history(),
        controller.last_checkpoint().map(str::to_string),
    );

    let malformed = "checkpoint_20000101_000000_000001.json";
    fs::write(dir.checkpoints.join(malformed), "{\"state\": ").unwrap();

    let unknown_state = "checkpoint_20000101_000000_000002.json";
    fs::write(
        dir.checkpoints.join(unknown_state),
        r#"{"checkpoint_id":"20000101_000000_000002","state":"sleeping","context":{},"history":[],"timestamp":"2000-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let inconsistent = "checkpoint_20000101_000000_000003.json";
    fs::write(
        dir.checkpoints.join(inconsistent),
        r#"{"checkpoint_id":"20000101_000000_000003","state":"completed","context":{},"history":[],"timestamp":"2000-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    // State agrees with the last record, but idle -> completed is not an edge.
    let illegal_edge = "checkpoint_20000101_000000_000004.json";
    fs::write(
        dir.checkpoints.join(illegal_edge),
        r#"{"checkpoint_id":"20000101_000000_000004","state":"completed","context":{},"history":[{"from":"idle","to":"completed","context":{},"timestamp":"2000-01-01T00:00:00Z"}],"timestamp":"2000-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    assert!(matches!(
        controller.load_checkpoint(malformed),
        Err(Error::CorruptCheckpoint { .. })
    ));
    assert!(matches!(
        controller.load_checkpoint(unknown_state),
        Err(Error::CorruptCheckpoint { .. })
    ));
    assert!(matches!(
        controller.load_checkpoint(inconsistent),
        Err(Error::CorruptCheckpoint { .. })
    ));
    assert!(matches!(
        controller.load_checkpoint(illegal_edge),
        Err(Error::CorruptCheckpoint { .. })
    ));
    assert!(matches!(
        controller.load_checkpoint("checkpoint_20000101_000000_000009.json"),
        Err(Error::CheckpointNotFound(_))
    ));

    let after = (
        controller.state(),
        controller.context().clone(),
        controller.export_history(),
        controller.last_checkpoint().map(str::to_string),
    );
    assert_eq!(before, after);
}

#[test]
fn test_reset_then_reload() {
    let dir = TestDir::new();
    let mut controller = dir.controller();
    drive(&mut controller, &UP_TO_QA[..2]);

    controller.reset();
    assert_eq!(controller.state(), WorkflowState::Idle);
    assert_eq!(controller.last_checkpoint(), None);

    assert!(controller.resume_latest().unwrap());
    assert_eq!(controller.state(), WorkflowState::LoadingSpecs);
}

#[test]
fn test_open_creates_nested_directory() {
    let dir = TestDir::new();
    assert!(!dir.checkpoints.exists());
    let _controller = WorkflowController::open(&dir.checkpoints).unwrap();
    assert!(dir.checkpoints.is_dir());
}
