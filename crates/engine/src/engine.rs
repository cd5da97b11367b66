// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Engine` context object.
//!
//! One explicitly-constructed value owns the whole orchestration surface:
//! registry, lifecycle controller, command executor, and the reaper task.
//! Startup is explicit (load registry, reconcile, spawn reaper) and so is
//! shutdown (stop reaper, cancel in-flight commands, drain).

use crate::config::EngineConfig;
use crate::controller::LifecycleController;
use crate::error::EngineError;
use crate::executor::CommandExecutor;
use crate::reaper::Reaper;
use crate::reconcile;
use crate::registry::Registry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use warden_adapters::ContainerRuntime;
use warden_core::{
    Clock, ExecChunk, ExecutionResult, ResourceSpec, SystemClock, Workspace, WorkspaceId,
};
use warden_storage::RegistryStore;

/// Filter for [`Engine::list_workspaces`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Keep only workspaces whose state label matches (e.g. "running")
    pub state: Option<String>,
    /// Include Removed tombstones in the result
    pub include_tombstones: bool,
}

/// A streamed command run: live output chunks plus the eventual result.
pub struct StreamedRun {
    pub chunks: mpsc::Receiver<ExecChunk>,
    pub result: JoinHandle<Result<ExecutionResult, EngineError>>,
}

pub struct Engine<C: Clock = SystemClock> {
    registry: Arc<Registry>,
    controller: Arc<LifecycleController<C>>,
    executor: Arc<CommandExecutor<C>>,
    shutdown: CancellationToken,
    reaper_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine<SystemClock> {
    /// Open the registry, reconcile against the runtime, and spawn the
    /// reaper.
    pub async fn start(
        config: EngineConfig,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self, EngineError> {
        Self::start_with_clock(config, runtime, SystemClock).await
    }
}

impl<C: Clock> Engine<C> {
    pub async fn start_with_clock(
        config: EngineConfig,
        runtime: Arc<dyn ContainerRuntime>,
        clock: C,
    ) -> Result<Self, EngineError> {
        let config = Arc::new(config);
        let store = RegistryStore::open(&config.state_dir)?;
        let registry = Arc::new(Registry::open(store)?);
        let controller = Arc::new(LifecycleController::new(
            registry.clone(),
            runtime,
            config.clone(),
            clock.clone(),
        ));
        let executor = Arc::new(CommandExecutor::new(
            registry.clone(),
            controller.clone(),
            config.clone(),
            clock.clone(),
        ));

        // Startup repair before accepting work
        reconcile::reconcile(&controller).await;

        let shutdown = CancellationToken::new();
        let reaper = Arc::new(Reaper::new(controller.clone(), clock));
        let handle = reaper.spawn(shutdown.child_token());
        tracing::info!(
            state_dir = %config.state_dir.display(),
            workspaces = registry.live_count(),
            "engine started"
        );

        Ok(Self {
            registry,
            controller,
            executor,
            shutdown,
            reaper_handle: Mutex::new(Some(handle)),
        })
    }

    /// Stop the reaper, cancel in-flight commands, and wait for them to
    /// drain. Workspaces are left as they are; a later engine reconciles.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.reaper_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.executor.cancel_all();
        while !self.executor.active_runs().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tracing::info!("engine stopped");
    }

    /// Create and start a workspace. With `id = None` a fresh id is
    /// generated; passing an id lets callers pre-announce it.
    pub async fn create_workspace(
        &self,
        id: Option<WorkspaceId>,
        spec: ResourceSpec,
    ) -> Result<Workspace, EngineError> {
        self.controller.create(id, spec).await
    }

    /// Fetch one workspace record. Tombstones are returned.
    pub fn get_workspace(&self, id: &WorkspaceId) -> Result<Workspace, EngineError> {
        self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    pub fn list_workspaces(&self, filter: &ListFilter) -> Vec<Workspace> {
        let mut out: Vec<Workspace> = self
            .registry
            .list()
            .into_iter()
            .filter(|ws| filter.include_tombstones || !ws.is_tombstone())
            .filter(|ws| match &filter.state {
                Some(label) => ws.state.label() == label,
                None => true,
            })
            .collect();
        out.sort_by_key(|ws| ws.created_at_ms);
        out
    }

    /// Run a command to completion inside a Running workspace.
    pub async fn run_command(
        &self,
        id: &WorkspaceId,
        command: &str,
        timeout: Option<Duration>,
        queue: bool,
    ) -> Result<ExecutionResult, EngineError> {
        self.executor.run(id, command, timeout, queue).await
    }

    /// As [`run_command`], but output chunks are delivered live on a
    /// channel while the run is in flight.
    ///
    /// [`run_command`]: Engine::run_command
    pub fn run_streamed(
        &self,
        id: &WorkspaceId,
        command: &str,
        timeout: Option<Duration>,
        queue: bool,
    ) -> StreamedRun {
        let (tx, rx) = mpsc::channel(64);
        let executor = self.executor.clone();
        let id = id.clone();
        let command = command.to_string();
        let result = tokio::spawn(async move {
            executor.run_forwarding(&id, &command, timeout, queue, tx).await
        });
        StreamedRun { chunks: rx, result }
    }

    /// Cancel the workspace's in-flight command, if any. Returns whether
    /// one was cancelled.
    pub fn cancel_command(&self, id: &WorkspaceId) -> bool {
        self.executor.cancel(id)
    }

    /// Gracefully stop a workspace. Idempotent past Stopping: returns the
    /// current state without touching the runtime.
    pub async fn stop_workspace(
        &self,
        id: &WorkspaceId,
    ) -> Result<warden_core::WorkspaceState, EngineError> {
        self.controller.stop(id).await
    }

    /// Remove a Stopped or Failed workspace, tombstoning the record.
    pub async fn remove_workspace(&self, id: &WorkspaceId) -> Result<(), EngineError> {
        self.controller.remove(id).await
    }

    /// Run one reaper sweep immediately (tests and admin tooling).
    pub async fn reap_now(&self) {
        let reaper = Reaper::new(self.controller.clone(), self.controller.clock.clone());
        reaper.tick().await;
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
