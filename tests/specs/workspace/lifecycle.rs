// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lifecycle specs
//!
//! Create, stop, remove, and the Failed path, observed through the public
//! engine API.

use crate::prelude::*;

#[tokio::test]
async fn create_provisions_directory_and_container() {
    let h = Harness::start().await;
    let ws = h.engine.create_workspace(None, ResourceSpec::default()).await.unwrap();

    assert_eq!(ws.state, WorkspaceState::Running);
    assert!(h.runtime.container_exists(&h.container_of(&ws.id)));
    assert!(h.workspaces_root().join(ws.id.as_str()).is_dir());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn stop_then_remove_tombstones_and_cleans_up() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    assert_eq!(h.engine.stop_workspace(&id).await.unwrap(), WorkspaceState::Stopped);
    h.engine.remove_workspace(&id).await.unwrap();

    let ws = h.engine.get_workspace(&id).unwrap();
    assert!(ws.is_tombstone());
    assert!(!h.runtime.container_exists(&h.container_of(&id)));
    assert!(!h.workspaces_root().join(id.as_str()).exists());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn stop_is_idempotent() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    h.engine.stop_workspace(&id).await.unwrap();
    let stops_before = h.runtime.call_count("stop");
    assert_eq!(h.engine.stop_workspace(&id).await.unwrap(), WorkspaceState::Stopped);
    assert_eq!(h.runtime.call_count("stop"), stops_before);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn remove_refuses_a_running_workspace() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    let err = h.engine.remove_workspace(&id).await.unwrap_err();
    assert!(matches!(err, EngineError::WrongState { .. }));
    assert_eq!(h.state_of(&id), WorkspaceState::Running);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn failed_creation_leaves_an_inspectable_record() {
    let h = Harness::start().await;
    h.runtime.push_create_error(RuntimeError::permanent("no such image: bogus"));

    let ws = h.engine.create_workspace(None, ResourceSpec::default()).await.unwrap();
    assert!(matches!(&ws.state, WorkspaceState::Failed { reason } if reason.contains("bogus")));

    // Failed workspaces are removable
    h.engine.remove_workspace(&ws.id).await.unwrap();
    assert!(h.engine.get_workspace(&ws.id).unwrap().is_tombstone());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn transient_runtime_errors_are_retried() {
    let h = Harness::start().await;
    h.runtime.push_create_error(RuntimeError::transient("docker daemon busy"));

    let ws = h.engine.create_workspace(None, ResourceSpec::default()).await.unwrap();
    assert_eq!(ws.state, WorkspaceState::Running);
    assert_eq!(h.runtime.call_count("create"), 2);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn list_reflects_states_and_hides_tombstones_by_default() {
    let h = Harness::start().await;
    let a = h.running_workspace().await;
    let b = h.running_workspace().await;
    h.engine.stop_workspace(&b).await.unwrap();
    h.engine.remove_workspace(&b).await.unwrap();

    let live = h.engine.list_workspaces(&ListFilter::default());
    assert_eq!(live.iter().map(|w| w.id.clone()).collect::<Vec<_>>(), vec![a]);

    let all = h
        .engine
        .list_workspaces(&ListFilter { include_tombstones: true, ..Default::default() });
    assert_eq!(all.len(), 2);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn tombstones_stay_queryable_until_retention_expires() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;
    h.engine.stop_workspace(&id).await.unwrap();
    h.engine.remove_workspace(&id).await.unwrap();

    h.clock.advance(Duration::from_secs(60));
    h.engine.reap_now().await;
    assert!(h.engine.get_workspace(&id).unwrap().is_tombstone());

    h.clock.advance(Duration::from_secs(61));
    h.engine.reap_now().await;
    assert!(matches!(h.engine.get_workspace(&id), Err(EngineError::NotFound(_))));

    h.engine.shutdown().await;
}
