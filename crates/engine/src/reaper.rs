// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reaper: idle eviction, lifetime caps, tombstone purge, and
//! reconciliation, on a fixed interval.
//!
//! The reaper only ever calls the lifecycle controller's public operations,
//! so everything it does obeys the same locks and transitions as a caller
//! would. A workspace busy with a command never looks idle because
//! `last_active_at_ms` is refreshed when the command finishes.

use crate::controller::LifecycleController;
use crate::reconcile;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use warden_core::{Clock, WorkspaceState};

pub(crate) struct Reaper<C: Clock> {
    controller: Arc<LifecycleController<C>>,
    clock: C,
}

impl<C: Clock> Reaper<C> {
    pub fn new(controller: Arc<LifecycleController<C>>, clock: C) -> Self {
        Self { controller, clock }
    }

    /// Spawn the sweep loop. Cancelling `shutdown` ends it after the
    /// current tick.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let interval = self.controller.config.reaper_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; skip it,
            // startup already ran a reconcile pass.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.tick().await,
                    () = shutdown.cancelled() => {
                        tracing::debug!("reaper stopping");
                        return;
                    }
                }
            }
        })
    }

    /// One full sweep: evict expired workspaces, purge stale tombstones,
    /// reconcile registry against runtime.
    pub async fn tick(&self) {
        let now = self.clock.epoch_ms();

        for ws in self.controller.registry.list() {
            match ws.state {
                // Stopped and Failed workspaces still pin a container or
                // work dir, so the same expiry applies; eviction's stop is
                // a no-op for them and remove tombstones the record.
                WorkspaceState::Running
                | WorkspaceState::Stopped
                | WorkspaceState::Failed { .. } => {
                    let idle_for = now.saturating_sub(ws.last_active_at_ms);
                    let alive_for = now.saturating_sub(ws.created_at_ms);
                    let reason = if alive_for >= self.controller.config.max_lifetime.as_millis() as u64 {
                        Some("lifetime cap")
                    } else if idle_for >= self.controller.config.idle_timeout.as_millis() as u64 {
                        Some("idle timeout")
                    } else {
                        None
                    };
                    if let Some(reason) = reason {
                        tracing::info!(workspace_id = %ws.id, reason, "evicting workspace");
                        self.evict(&ws.id).await;
                    }
                }
                // Busy workspaces never look idle, but the lifetime cap is
                // unconditional; stop waits for the in-flight command.
                WorkspaceState::Busy => {
                    let alive_for = now.saturating_sub(ws.created_at_ms);
                    if alive_for >= self.controller.config.max_lifetime.as_millis() as u64 {
                        tracing::info!(workspace_id = %ws.id, reason = "lifetime cap", "evicting workspace");
                        self.evict(&ws.id).await;
                    }
                }
                WorkspaceState::Removed => {
                    let retained = now.saturating_sub(ws.removed_at_ms.unwrap_or(now));
                    if retained >= self.controller.config.tombstone_retention.as_millis() as u64 {
                        if let Err(e) = self.controller.purge_tombstone(&ws.id) {
                            tracing::warn!(workspace_id = %ws.id, error = %e, "purge failed");
                        }
                    }
                }
                _ => {}
            }
        }

        reconcile::reconcile(&self.controller).await;
    }

    /// Stop then remove; each step tolerates the record having moved on.
    async fn evict(&self, id: &warden_core::WorkspaceId) {
        if let Err(e) = self.controller.stop(id).await {
            tracing::warn!(workspace_id = %id, error = %e, "eviction stop failed");
            return;
        }
        if let Err(e) = self.controller.remove(id).await {
            tracing::warn!(workspace_id = %id, error = %e, "eviction remove failed");
        }
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
