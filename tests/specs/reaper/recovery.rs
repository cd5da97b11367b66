// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery and reconciliation specs
//!
//! The registry survives engine restarts; startup reconciliation repairs
//! divergence between records and the runtime.

use crate::prelude::*;

#[tokio::test]
async fn workspaces_survive_an_engine_restart() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let h = h.restart().await;
    assert_eq!(h.state_of(&id), WorkspaceState::Running);
    let result = h.engine.run_command(&id, "echo back", None, false).await.unwrap();
    assert_eq!(result.tail.as_str(), "back\n");

    h.engine.shutdown().await;
}

#[tokio::test]
async fn vanished_containers_are_detected_at_startup() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;
    h.runtime.remove_externally(&h.container_of(&id));

    let h = h.restart().await;
    let ws = h.engine.get_workspace(&id).unwrap();
    assert!(matches!(&ws.state, WorkspaceState::Failed { reason } if reason == "container missing"));

    // Failed workspaces remain removable
    h.engine.remove_workspace(&id).await.unwrap();
    h.engine.shutdown().await;
}

#[tokio::test]
async fn externally_stopped_containers_fail_their_records() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;
    // The container dies without the engine's involvement
    use warden_adapters::ContainerRuntime;
    h.runtime.stop(&h.container_of(&id), Duration::ZERO).await.unwrap();

    h.engine.reap_now().await;
    assert!(matches!(h.state_of(&id), WorkspaceState::Failed { .. }));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn orphan_containers_are_swept() {
    let h = Harness::start().await;
    h.runtime.add_orphan("warden-wks-leftover");

    h.engine.reap_now().await;
    assert!(!h.runtime.container_exists(&"warden-wks-leftover".into()));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn foreign_containers_are_not_touched() {
    let h = Harness::start().await;
    h.runtime.add_orphan("someone-elses-container");

    h.engine.reap_now().await;
    assert!(h.runtime.container_exists(&"someone-elses-container".into()));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn interrupted_command_recovers_on_restart() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    // Run a long command and restart mid-flight; shutdown cancels the run
    // but the record may have persisted as Busy before the engine died.
    let run = h.engine.run_streamed(&id, "sleep 30", None, false);
    while h.state_of(&id) != WorkspaceState::Busy {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let h = h.restart().await;
    let _ = run.result.await;

    // Startup reconciliation returned the workspace to service
    assert_eq!(h.state_of(&id), WorkspaceState::Running);
    let result = h.engine.run_command(&id, "echo recovered", None, false).await.unwrap();
    assert_eq!(result.tail.as_str(), "recovered\n");

    h.engine.shutdown().await;
}
