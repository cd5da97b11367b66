// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ContainerRuntime` trait — create/start/exec/stop/remove/inspect.
//!
//! Pure capability boundary: implementations know nothing about workspaces,
//! registries, or lifecycle states. All operations are idempotent on the
//! "already in target state" case (removing a missing container is Ok).

use crate::error::RuntimeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use warden_core::ExecChunk;

/// Opaque backing-runtime identifier for a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerRef(pub String);

impl ContainerRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContainerRef {
    fn from(s: &str) -> Self {
        ContainerRef(s.to_string())
    }
}

impl From<String> for ContainerRef {
    fn from(s: String) -> Self {
        ContainerRef(s)
    }
}

/// Everything a runtime needs to create one container.
///
/// Built by the engine from a workspace's resource spec; the adapter never
/// sees the workspace record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name, unique per workspace (e.g. "warden-wks-abc")
    pub name: String,
    pub image: String,
    pub mem_limit: String,
    /// CPU quota in microseconds per scheduling period
    pub cpu_quota: u64,
    pub env: BTreeMap<String, String>,
    pub network_enabled: bool,
    /// Host directory mounted read-write at /workspace
    pub work_dir: PathBuf,
}

/// Observed container state from `inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited,
    Missing,
}

/// A live command execution: a finite, non-restartable chunk stream plus
/// the eventual exit code.
///
/// The chunk channel closes when the command ends. If the run is terminated
/// via the cancellation token handed to `exec`, the exit sender may be
/// dropped instead of resolved; consumers treat that as a killed command.
#[derive(Debug)]
pub struct ExecStream {
    /// Output chunks in arrival order
    pub chunks: mpsc::Receiver<ExecChunk>,
    /// Exit code of the command, once it ends
    pub exit: oneshot::Receiver<Result<i64, RuntimeError>>,
}

/// Capability contract over a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container from the spec. Does not start it.
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerRef, RuntimeError>;

    /// Start a created container. Starting an already-running container is Ok.
    async fn start(&self, container: &ContainerRef) -> Result<(), RuntimeError>;

    /// Run a command inside a running container.
    ///
    /// Cancelling `cancel` terminates the command; the stream ends shortly
    /// after. The adapter never blocks other containers' operations while a
    /// command runs.
    async fn exec(
        &self,
        container: &ContainerRef,
        command: &str,
        cancel: CancellationToken,
    ) -> Result<ExecStream, RuntimeError>;

    /// Gracefully stop, escalating to SIGKILL after `grace`.
    /// Stopping an already-stopped container is Ok.
    async fn stop(&self, container: &ContainerRef, grace: Duration) -> Result<(), RuntimeError>;

    /// Force-remove the container. Removing a missing container is Ok.
    async fn remove(&self, container: &ContainerRef) -> Result<(), RuntimeError>;

    /// Report whether the container is running, exited, or gone.
    async fn inspect(&self, container: &ContainerRef) -> Result<ContainerStatus, RuntimeError>;

    /// List containers whose names start with `name_prefix` (orphan sweep).
    async fn list(&self, name_prefix: &str) -> Result<Vec<ContainerRef>, RuntimeError>;
}
