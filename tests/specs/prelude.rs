// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for workspace orchestration specs.

pub use std::time::Duration;
pub use warden_adapters::{ContainerRef, FakeRuntime, RuntimeError};
pub use warden_core::{
    ExecChunk, ExitClass, FakeClock, ResourceSpec, WorkspaceId, WorkspaceState,
};
pub use warden_engine::{Engine, EngineConfig, EngineError, ListFilter};

/// One engine instance on a scripted runtime, temp dirs, and a fake clock.
pub struct Harness {
    dir: tempfile::TempDir,
    config: EngineConfig,
    pub runtime: FakeRuntime,
    pub clock: FakeClock,
    pub engine: Engine<FakeClock>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(tweak: impl FnOnce(&mut EngineConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig {
            state_dir: dir.path().join("state"),
            workspaces_root: dir.path().join("workspaces"),
            retry_base_delay: Duration::from_millis(1),
            idle_timeout: Duration::from_secs(60),
            max_lifetime: Duration::from_secs(600),
            tombstone_retention: Duration::from_secs(120),
            ..EngineConfig::default()
        };
        tweak(&mut config);
        let runtime = FakeRuntime::new();
        let clock = FakeClock::new();
        let engine = Engine::start_with_clock(
            config.clone(),
            std::sync::Arc::new(runtime.clone()),
            clock.clone(),
        )
        .await
        .unwrap();
        Self { dir, config, runtime, clock, engine }
    }

    /// Shut the engine down and start a fresh one on the same state dir,
    /// runtime, and clock, as after a daemon restart.
    pub async fn restart(self) -> Self {
        self.engine.shutdown().await;
        let engine = Engine::start_with_clock(
            self.config.clone(),
            std::sync::Arc::new(self.runtime.clone()),
            self.clock.clone(),
        )
        .await
        .unwrap();
        Self { engine, ..self }
    }

    /// Create a workspace and return its id.
    pub async fn running_workspace(&self) -> WorkspaceId {
        self.engine.create_workspace(None, ResourceSpec::default()).await.unwrap().id
    }

    pub fn state_of(&self, id: &WorkspaceId) -> WorkspaceState {
        self.engine.get_workspace(id).unwrap().state
    }

    pub fn container_of(&self, id: &WorkspaceId) -> ContainerRef {
        format!("warden-{}", id).into()
    }

    pub fn workspaces_root(&self) -> std::path::PathBuf {
        self.dir.path().join("workspaces")
    }
}
