// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution specs
//!
//! Exit classification, serialization per workspace, timeouts, and the
//! Busy/Overloaded surface.

use crate::prelude::*;

#[tokio::test]
async fn command_output_and_exit_code_are_reported() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let ok = h.engine.run_command(&id, "echo hello", None, false).await.unwrap();
    assert_eq!(ok.class, ExitClass::Exited(0));
    assert!(ok.is_success());
    assert_eq!(ok.tail.as_str(), "hello\n");

    let failed = h.engine.run_command(&id, "exit 7", None, false).await.unwrap();
    assert_eq!(failed.class, ExitClass::Exited(7));
    assert!(!failed.is_success());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn last_exit_is_retained_on_the_record() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    h.engine.run_command(&id, "echo first", None, false).await.unwrap();
    h.engine.run_command(&id, "exit 2", None, false).await.unwrap();

    let exit_info = h.engine.get_workspace(&id).unwrap().exit_info.unwrap();
    assert_eq!(exit_info.class, ExitClass::Exited(2));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn commands_require_a_running_workspace() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;
    h.engine.stop_workspace(&id).await.unwrap();

    let err = h.engine.run_command(&id, "echo hi", None, false).await.unwrap_err();
    assert!(matches!(err, EngineError::WrongState { .. }));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn timeout_kills_the_command_but_not_the_workspace() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let result = h
        .engine
        .run_command(&id, "sleep 10", Some(Duration::from_millis(50)), false)
        .await
        .unwrap();
    assert_eq!(result.class, ExitClass::Timeout);
    assert_eq!(h.state_of(&id), WorkspaceState::Running);

    // The workspace is immediately usable again
    let next = h.engine.run_command(&id, "echo alive", None, false).await.unwrap();
    assert_eq!(next.tail.as_str(), "alive\n");

    h.engine.shutdown().await;
}

#[tokio::test]
async fn concurrent_commands_on_one_workspace_are_serialized() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let slow = h.engine.run_streamed(&id, "sleep 0.2", None, false);
    // Wait until the slow run holds the workspace
    while h.state_of(&id) != WorkspaceState::Busy {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Without queueing: Busy straight away
    let err = h.engine.run_command(&id, "echo hi", None, false).await.unwrap_err();
    assert!(matches!(err, EngineError::Busy(_)));

    // With queueing: runs after the slow command releases the workspace
    let queued = h.engine.run_command(&id, "echo queued", None, true).await.unwrap();
    assert_eq!(queued.tail.as_str(), "queued\n");

    slow.result.await.unwrap().unwrap();
    h.engine.shutdown().await;
}

#[tokio::test]
async fn queue_overflow_is_rejected() {
    let h = Harness::start_with(|c| c.exec_queue_depth = 0).await;
    let id = h.running_workspace().await;

    let slow = h.engine.run_streamed(&id, "sleep 0.2", None, false);
    while h.state_of(&id) != WorkspaceState::Busy {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = h.engine.run_command(&id, "echo hi", None, true).await.unwrap_err();
    assert!(matches!(err, EngineError::Overloaded(_)));

    slow.result.await.unwrap().unwrap();
    h.engine.shutdown().await;
}

#[tokio::test]
async fn commands_on_distinct_workspaces_run_in_parallel() {
    let h = Harness::start().await;
    let a = h.running_workspace().await;
    let b = h.running_workspace().await;

    let started = std::time::Instant::now();
    let (ra, rb) = tokio::join!(
        h.engine.run_command(&a, "sleep 0.2", None, false),
        h.engine.run_command(&b, "sleep 0.2", None, false),
    );
    ra.unwrap();
    rb.unwrap();
    assert!(started.elapsed() < Duration::from_millis(390));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn queued_commands_never_interleave() {
    let h = Harness::start_with(|c| c.exec_queue_depth = 8).await;
    let id = h.running_workspace().await;

    // Fire a burst of queued runs; serialization means every one completes
    // with exactly its own output, in whatever order the queue grants.
    let runs: Vec<_> = (0..6)
        .map(|n| h.engine.run_streamed(&id, &format!("echo run-{}", n), None, true))
        .collect();
    let mut outputs = Vec::new();
    for run in runs {
        let result = run.result.await.unwrap().unwrap();
        assert_eq!(result.class, ExitClass::Exited(0));
        outputs.push(result.tail.as_str().to_string());
    }
    outputs.sort();
    let expected: Vec<_> = (0..6).map(|n| format!("run-{}\n", n)).collect();
    assert_eq!(outputs, expected);

    assert_eq!(h.state_of(&id), WorkspaceState::Running);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn output_tail_is_bounded() {
    let h = Harness::start_with(|c| c.output_tail_limit = 8).await;
    let id = h.running_workspace().await;

    let result = h
        .engine
        .run_command(&id, "echo 0123456789abcdef", None, false)
        .await
        .unwrap();
    assert!(result.tail.is_truncated());
    assert_eq!(result.tail.as_str().len(), 8);
    assert!(result.tail.as_str().ends_with("abcdef\n"));

    h.engine.shutdown().await;
}
