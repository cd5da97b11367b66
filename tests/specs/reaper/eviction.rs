// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle eviction and lifetime cap specs

use crate::prelude::*;

#[tokio::test]
async fn idle_workspaces_are_evicted() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    h.clock.advance(Duration::from_secs(61));
    h.engine.reap_now().await;

    assert!(h.engine.get_workspace(&id).unwrap().is_tombstone());
    assert!(!h.runtime.container_exists(&h.container_of(&id)));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn running_a_command_defers_idle_eviction() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    h.clock.advance(Duration::from_secs(45));
    h.engine.run_command(&id, "echo ping", None, false).await.unwrap();

    h.clock.advance(Duration::from_secs(45));
    h.engine.reap_now().await;
    // 90s old, but active 45s ago
    assert_eq!(h.state_of(&id), WorkspaceState::Running);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn lifetime_cap_evicts_even_active_workspaces() {
    let h = Harness::start().await;
    let id = h.running_workspace().await;

    // Keep the workspace active past its lifetime
    for _ in 0..11 {
        h.clock.advance(Duration::from_secs(59));
        h.engine.run_command(&id, "echo ping", None, false).await.unwrap();
    }

    h.engine.reap_now().await;
    assert!(h.engine.get_workspace(&id).unwrap().is_tombstone());

    h.engine.shutdown().await;
}
