// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry-vs-runtime reconciliation.
//!
//! The registry is the source of intended state, the runtime the source of
//! actual state. Run at startup and on every reaper tick, this pass
//! resolves divergence in both directions: registry records whose
//! container vanished become `Failed`, and runtime containers with no live
//! record are orphans, logged and force-removed.

use crate::container_name;
use crate::controller::LifecycleController;
use crate::CONTAINER_PREFIX;
use warden_adapters::ContainerStatus;
use warden_core::{Clock, WorkspaceState};

/// One reconciliation pass. Never mutates state except through the
/// controller, and skips workspaces whose operation lock is contended —
/// an in-flight operation will leave them consistent itself.
pub(crate) async fn reconcile<C: Clock>(controller: &LifecycleController<C>) {
    reconcile_records(controller).await;
    reconcile_orphans(controller).await;
}

async fn reconcile_records<C: Clock>(controller: &LifecycleController<C>) {
    let records = controller.registry.list();
    for ws in records {
        if ws.state.is_terminal() {
            continue;
        }

        let lock = controller.registry.op_lock(&ws.id);
        let Ok(_guard) = lock.try_lock() else {
            continue;
        };

        // Re-read under the lock; the record may have moved on
        let Some(ws) = controller.registry.get(&ws.id) else { continue };
        if ws.state.is_terminal() {
            continue;
        }

        let container = container_name(&ws.id).into();
        let status = match controller.runtime.inspect(&container).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(workspace_id = %ws.id, error = %e, "inspect failed, skipping");
                continue;
            }
        };

        match (&ws.state, status) {
            // Intended running, actually running: converged
            (WorkspaceState::Running, ContainerStatus::Running) => {}

            // A Busy record with no executor in flight means the engine
            // restarted mid-command; the workspace itself is fine.
            (WorkspaceState::Busy, ContainerStatus::Running) => {
                tracing::info!(workspace_id = %ws.id, "recovering busy workspace after restart");
                if let Err(e) = controller.recover_busy(&ws.id) {
                    tracing::warn!(workspace_id = %ws.id, error = %e, "busy recovery failed");
                }
            }

            // Container gone or dead underneath a live record
            (_, ContainerStatus::Missing) => {
                tracing::warn!(
                    workspace_id = %ws.id,
                    state = %ws.state,
                    "orphan registry entry: container missing"
                );
                if let Err(e) = controller.mark_failed(&ws.id, "container missing") {
                    tracing::warn!(workspace_id = %ws.id, error = %e, "mark failed");
                }
            }
            (_, ContainerStatus::Exited) => {
                tracing::warn!(
                    workspace_id = %ws.id,
                    state = %ws.state,
                    "container exited outside engine control"
                );
                if let Err(e) = controller.mark_failed(&ws.id, "container exited") {
                    tracing::warn!(workspace_id = %ws.id, error = %e, "mark failed");
                }
            }

            // Pending/Creating/Stopping with a running container: an
            // interrupted operation; fail the record, the container gets
            // swept as an orphan once the record is removed.
            (_, ContainerStatus::Running) => {
                if let Err(e) = controller.mark_failed(&ws.id, "interrupted operation") {
                    tracing::warn!(workspace_id = %ws.id, error = %e, "mark failed");
                }
            }
        }
    }
}

async fn reconcile_orphans<C: Clock>(controller: &LifecycleController<C>) {
    let containers = match controller.runtime.list(CONTAINER_PREFIX).await {
        Ok(containers) => containers,
        Err(e) => {
            tracing::warn!(error = %e, "container listing failed, skipping orphan sweep");
            return;
        }
    };

    for container in containers {
        let Some(suffix) = container.as_str().strip_prefix(CONTAINER_PREFIX) else {
            continue;
        };
        let id = warden_core::WorkspaceId::from_string(suffix);
        let live = controller.registry.get(&id).map(|ws| !ws.is_tombstone()).unwrap_or(false);
        if live {
            continue;
        }

        tracing::warn!(%container, "orphan container detected, removing");
        if let Err(e) = controller.runtime.remove(&container).await {
            tracing::warn!(%container, error = %e, "orphan removal failed");
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
