// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streamed execution and cancellation specs

use crate::prelude::*;

#[tokio::test]
async fn streamed_runs_deliver_chunks_then_the_result() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let mut run = h.engine.run_streamed(&id, "echo streamed", None, false);
    let mut stdout = String::new();
    while let Some(chunk) = run.chunks.recv().await {
        if let ExecChunk::Stdout(s) = chunk {
            stdout.push_str(&s);
        }
    }
    let result = run.result.await.unwrap().unwrap();

    assert_eq!(stdout, "streamed\n");
    assert_eq!(result.class, ExitClass::Exited(0));
    assert_eq!(result.tail.as_str(), "streamed\n");

    h.engine.shutdown().await;
}

#[tokio::test]
async fn stderr_is_streamed_distinctly() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let mut run = h.engine.run_streamed(&id, "stderr warning", None, false);
    let chunk = run.chunks.recv().await.unwrap();
    assert_eq!(chunk, ExecChunk::Stderr("warning\n".into()));
    run.result.await.unwrap().unwrap();

    h.engine.shutdown().await;
}

#[tokio::test]
async fn cancellation_classifies_the_run_and_frees_the_workspace() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let run = h.engine.run_streamed(&id, "sleep 30", None, false);
    loop {
        if h.engine.cancel_command(&id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let result = run.result.await.unwrap().unwrap();
    assert_eq!(result.class, ExitClass::Cancelled);
    assert_eq!(h.state_of(&id), WorkspaceState::Running);
    assert_eq!(h.engine.get_workspace(&id).unwrap().exit_info.unwrap().class, ExitClass::Cancelled);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn cancel_with_nothing_in_flight_reports_false() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;
    assert!(!h.engine.cancel_command(&id));
    h.engine.shutdown().await;
}
