// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle controller — drives workspaces through the state machine.
//!
//! Every transition runs under the workspace's operation lock and commits
//! the registry before the lock releases. Long runtime calls (create,
//! stop) hold only the per-workspace lock plus a permit from the global
//! operation semaphore, never the registry's map lock, so distinct
//! workspaces proceed fully in parallel.

use crate::config::EngineConfig;
use crate::container_name;
use crate::error::EngineError;
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use warden_adapters::{ContainerRuntime, ContainerSpec, RuntimeError};
use warden_core::{Clock, ExitInfo, ResourceSpec, Workspace, WorkspaceId, WorkspaceState};

pub(crate) struct LifecycleController<C: Clock> {
    pub(crate) registry: Arc<Registry>,
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) clock: C,
    /// Ceiling on simultaneous create/stop operations
    ops: Arc<Semaphore>,
}

impl<C: Clock> LifecycleController<C> {
    pub fn new(
        registry: Arc<Registry>,
        runtime: Arc<dyn ContainerRuntime>,
        config: Arc<EngineConfig>,
        clock: C,
    ) -> Self {
        let ops = Arc::new(Semaphore::new(config.max_concurrent_ops));
        Self { registry, runtime, config, clock, ops }
    }

    /// Create a workspace: allocate the record, provision the work
    /// directory, then create and start the backing container.
    ///
    /// The attempt is not retried past the transient-backoff budget; a
    /// failed workspace stays registered in `Failed` for the caller to
    /// inspect and remove.
    pub async fn create(
        &self,
        id: Option<WorkspaceId>,
        spec: ResourceSpec,
    ) -> Result<Workspace, EngineError> {
        spec.validate()?;
        let id = id.unwrap_or_default();

        if self.registry.live_count() >= self.config.max_workspaces {
            return Err(EngineError::QuotaExceeded(format!(
                "{} live workspaces (max {})",
                self.registry.live_count(),
                self.config.max_workspaces
            )));
        }

        // Take an operation permit before registering anything so a
        // rejected create leaves no record behind.
        let _permit = self.ops.clone().try_acquire_owned().map_err(|_| {
            EngineError::QuotaExceeded(format!(
                "{} lifecycle operations in flight (max {})",
                self.config.max_concurrent_ops, self.config.max_concurrent_ops
            ))
        })?;

        let work_dir = self.config.work_dir(&id);
        let record = Workspace::new(id.clone(), spec, work_dir, self.clock.epoch_ms());
        if !self.registry.insert_new(record)? {
            return Err(EngineError::AlreadyExists(id));
        }

        let lock = self.registry.op_lock(&id);
        let _guard = lock.lock().await;

        let mut ws = self.registry.get(&id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        ws.state = ws.state.check_transition(WorkspaceState::Creating)?;
        self.registry.commit(ws.clone())?;

        // Work directory must exist before the container can run
        if let Err(e) = tokio::fs::create_dir_all(&ws.work_dir).await {
            let reason = format!("failed to create work dir: {}", e);
            return self.fail(ws, reason).await;
        }

        let container_spec = build_container_spec(&ws);
        // Create and start retry independently: re-running create after it
        // succeeded would hit a name conflict.
        let started = match self
            .with_retry("create", || async { self.runtime.create(&container_spec).await })
            .await
        {
            Ok(container) => self
                .with_retry("start", || async { self.runtime.start(&container).await })
                .await
                .map(|()| container),
            Err(e) => Err(e),
        };

        match started {
            Ok(container) => {
                ws.state = ws.state.check_transition(WorkspaceState::Running)?;
                ws.container_ref = Some(container.0.clone());
                self.registry.commit(ws.clone())?;
                tracing::info!(workspace_id = %id, container = %container, "workspace running");
                Ok(ws)
            }
            Err(e) => {
                // Best-effort: don't leak a half-created container
                let _ = self.runtime.remove(&container_name(&id).into()).await;
                self.fail(ws, e.to_string()).await
            }
        }
    }

    /// Transition a workspace to `Failed`, preserving the reason.
    async fn fail(&self, mut ws: Workspace, reason: String) -> Result<Workspace, EngineError> {
        tracing::warn!(workspace_id = %ws.id, %reason, "workspace failed");
        ws.state = ws.state.check_transition(WorkspaceState::Failed { reason })?;
        ws.container_ref = None;
        self.registry.commit(ws.clone())?;
        Ok(ws)
    }

    /// Gracefully stop a workspace's container.
    ///
    /// No-op returning the current state when the workspace is already
    /// past stopping — no runtime calls are made in that case.
    pub async fn stop(&self, id: &WorkspaceId) -> Result<WorkspaceState, EngineError> {
        // Existence check before taking the lock
        self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;

        // Permit before lock, same order as create, so nothing ever waits
        // for a permit while holding an operation lock.
        let _permit = self
            .ops
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::ShuttingDown)?;

        let lock = self.registry.op_lock(id);
        let _guard = lock.lock().await;

        let mut ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if !matches!(ws.state, WorkspaceState::Running | WorkspaceState::Busy) {
            return Ok(ws.state);
        }

        ws.state = ws.state.check_transition(WorkspaceState::Stopping)?;
        self.registry.commit(ws.clone())?;

        let container = container_name(id).into();
        let stopped = self
            .with_retry("stop", || async {
                self.runtime.stop(&container, self.config.stop_grace).await
            })
            .await;

        match stopped {
            Ok(()) => {
                ws.state = ws.state.check_transition(WorkspaceState::Stopped)?;
                self.registry.commit(ws.clone())?;
                tracing::info!(workspace_id = %id, "workspace stopped");
                Ok(ws.state)
            }
            Err(e) => {
                // Graceful stop exhausted retries; force-remove the container
                // so nothing keeps running, then mark the record failed.
                tracing::warn!(workspace_id = %id, error = %e, "graceful stop failed, forcing");
                let forced = self.runtime.remove(&container).await;
                let reason = match forced {
                    Ok(()) => format!("graceful stop failed: {}", e),
                    Err(f) => format!("stop failed: {}; forced removal failed: {}", e, f),
                };
                let ws = self.fail(ws, reason).await?;
                Ok(ws.state)
            }
        }
    }

    /// Remove a stopped or failed workspace: delete the container, delete
    /// the work directory, tombstone the record.
    pub async fn remove(&self, id: &WorkspaceId) -> Result<(), EngineError> {
        self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;

        let lock = self.registry.op_lock(id);
        let _guard = lock.lock().await;

        let mut ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        match ws.state {
            WorkspaceState::Stopped | WorkspaceState::Failed { .. } => {}
            WorkspaceState::Removed => return Ok(()),
            _ => return Err(EngineError::wrong_state(id.clone(), &ws.state, "stopped or failed")),
        }

        // Container removal is idempotent on missing; name is derived from
        // the id so Failed records (no container ref) still clean up.
        self.with_retry("remove", || async {
            self.runtime.remove(&container_name(id).into()).await
        })
        .await?;

        // Work directory removal is best-effort, matching the record even
        // if a stray file survives; the tombstone is what callers observe.
        if ws.work_dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&ws.work_dir).await {
                tracing::warn!(
                    workspace_id = %id,
                    path = %ws.work_dir.display(),
                    error = %e,
                    "failed to remove work dir (best-effort)"
                );
            }
        }

        ws.state = ws.state.check_transition(WorkspaceState::Removed)?;
        ws.container_ref = None;
        ws.removed_at_ms = Some(self.clock.epoch_ms());
        self.registry.commit(ws)?;
        tracing::info!(workspace_id = %id, "workspace removed");
        Ok(())
    }

    /// Purge a tombstone past its retention window. Reaper-only path.
    pub fn purge_tombstone(&self, id: &WorkspaceId) -> Result<(), EngineError> {
        if let Some(ws) = self.registry.get(id) {
            if !ws.is_tombstone() {
                return Err(EngineError::wrong_state(id.clone(), &ws.state, "removed"));
            }
            self.registry.purge(id)?;
            tracing::info!(workspace_id = %id, "tombstone purged");
        }
        Ok(())
    }

    /// Running -> Busy, called by the command executor while it holds the
    /// workspace's operation lock.
    pub fn begin_command(&self, id: &WorkspaceId) -> Result<Workspace, EngineError> {
        let mut ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if ws.state != WorkspaceState::Running {
            return Err(EngineError::wrong_state(id.clone(), &ws.state, "running"));
        }
        ws.state = ws.state.check_transition(WorkspaceState::Busy)?;
        self.registry.commit(ws.clone())?;
        Ok(ws)
    }

    /// Busy -> Running with the command's outcome recorded. The workspace
    /// survives timeouts and cancellations; only stop/remove end its life.
    pub fn finish_command(
        &self,
        id: &WorkspaceId,
        exit_info: ExitInfo,
    ) -> Result<(), EngineError> {
        let mut ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        ws.state = ws.state.check_transition(WorkspaceState::Running)?;
        ws.last_active_at_ms = self.clock.epoch_ms();
        ws.exit_info = Some(exit_info);
        self.registry.commit(ws)?;
        Ok(())
    }

    /// Busy -> Running for a record left Busy by an interrupted engine.
    /// Reconcile-only path; the caller holds the operation lock and has
    /// verified no run is actually in flight.
    pub fn recover_busy(&self, id: &WorkspaceId) -> Result<(), EngineError> {
        let mut ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if ws.state != WorkspaceState::Busy {
            return Ok(());
        }
        ws.state = ws.state.check_transition(WorkspaceState::Running)?;
        ws.last_active_at_ms = self.clock.epoch_ms();
        self.registry.commit(ws)?;
        Ok(())
    }

    /// Mark a workspace failed from the reconciliation path. The caller
    /// (reconcile) holds the operation lock.
    pub fn mark_failed(&self, id: &WorkspaceId, reason: &str) -> Result<(), EngineError> {
        let Some(ws) = self.registry.get(id) else { return Ok(()) };
        if ws.state.is_terminal() {
            return Ok(());
        }
        self.fail_sync(ws, reason.to_string())
    }

    fn fail_sync(&self, mut ws: Workspace, reason: String) -> Result<(), EngineError> {
        tracing::warn!(workspace_id = %ws.id, %reason, "workspace failed");
        // Busy/Running/Creating records reach Failed through Stopping when
        // the diagram requires it; reconcile only ever sees missing
        // containers, where the direct edge from Creating/Stopping applies.
        let target = WorkspaceState::Failed { reason };
        ws.state = match ws.state.check_transition(target.clone()) {
            Ok(next) => next,
            Err(_) => {
                // Running/Busy reach Failed via Stopping; Pending via Creating
                let via = ws
                    .state
                    .check_transition(WorkspaceState::Stopping)
                    .or_else(|_| ws.state.check_transition(WorkspaceState::Creating))?;
                via.check_transition(target)?
            }
        };
        ws.container_ref = None;
        self.registry.commit(ws)?;
        Ok(())
    }

    /// Run a runtime operation, retrying transient failures with bounded
    /// exponential backoff.
    async fn with_retry<T, F, Fut>(&self, what: &str, op: F) -> Result<T, RuntimeError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, RuntimeError>>,
    {
        let mut delay = self.config.retry_base_delay;
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        operation = what,
                        attempt,
                        error = %e,
                        "transient runtime error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(Duration::from_secs(5));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Translate a workspace record into the runtime's container spec.
pub(crate) fn build_container_spec(ws: &Workspace) -> ContainerSpec {
    ContainerSpec {
        name: container_name(&ws.id),
        image: ws.spec.image.clone(),
        mem_limit: ws.spec.mem_limit.clone(),
        cpu_quota: ws.spec.cpu_quota,
        env: ws.spec.env.clone(),
        network_enabled: ws.spec.network_enabled,
        work_dir: ws.work_dir.clone(),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
