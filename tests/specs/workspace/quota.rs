// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quota and validation specs
//!
//! Live-workspace caps, duplicate ids, and spec validation at the engine
//! boundary.

use crate::prelude::*;

#[tokio::test]
async fn live_workspace_cap_is_enforced() {
    let h = Harness::start_with(|c| c.max_workspaces = 2).await;
    h.running_workspace().await;
    h.running_workspace().await;

    let err = h
        .engine
        .create_workspace(None, ResourceSpec::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn removing_a_workspace_frees_quota() {
    let h = Harness::start_with(|c| c.max_workspaces = 1).await;
    let id = h.running_workspace().await;
    h.engine.stop_workspace(&id).await.unwrap();
    h.engine.remove_workspace(&id).await.unwrap();

    // Tombstones do not count against the cap
    h.running_workspace().await;

    h.engine.shutdown().await;
}

#[tokio::test]
async fn duplicate_explicit_id_is_rejected() {
    let h = Harness::start().await;
    let id = WorkspaceId::new();
    h.engine.create_workspace(Some(id.clone()), ResourceSpec::default()).await.unwrap();

    let err = h
        .engine
        .create_workspace(Some(id), ResourceSpec::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyExists(_)));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn invalid_spec_is_rejected_before_any_runtime_work() {
    let h = Harness::start().await;
    let calls_before = h.runtime.calls().len();

    let spec = ResourceSpec { image: "  ".into(), ..ResourceSpec::default() };
    let err = h.engine.create_workspace(None, spec).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidSpec(_)));
    assert_eq!(h.runtime.calls().len(), calls_before);
    assert!(h.engine.list_workspaces(&ListFilter::default()).is_empty());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn spec_is_returned_verbatim_on_get() {
    let h = Harness::start().await;
    let mut spec = ResourceSpec::with_image("alpine:3.20");
    spec.mem_limit = "256m".into();
    spec.env.insert("TOKEN".into(), "secret".into());
    spec.network_enabled = false;

    let ws = h.engine.create_workspace(None, spec.clone()).await.unwrap();
    assert_eq!(h.engine.get_workspace(&ws.id).unwrap().spec, spec);

    h.engine.shutdown().await;
}
