// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fake runtime for engine tests.
//!
//! Emulates a small command vocabulary so tests can exercise streaming,
//! timeouts, and exit codes without docker:
//!
//! - `echo <text>` — one stdout chunk, exit 0
//! - `stderr <text>` — one stderr chunk, exit 0
//! - `exit <code>` — exit with the code
//! - `sleep <secs>` — sleeps (cancellable), exit 0
//! - anything else — exit 0
//!
//! Failures are scripted per operation with [`FakeRuntime::push_create_error`]
//! and friends; every call is appended to an inspectable log.

use crate::error::RuntimeError;
use crate::runtime::{ContainerRef, ContainerRuntime, ContainerSpec, ContainerStatus, ExecStream};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use warden_core::ExecChunk;

#[derive(Debug, Clone)]
struct FakeContainer {
    running: bool,
}

#[derive(Default)]
struct Inner {
    containers: HashMap<String, FakeContainer>,
    calls: Vec<String>,
    create_errors: VecDeque<RuntimeError>,
    start_errors: VecDeque<RuntimeError>,
    stop_errors: VecDeque<RuntimeError>,
    create_delay: Option<Duration>,
}

/// Scriptable in-memory container runtime.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every runtime call in order, formatted as "<verb> <target>".
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    /// Count of calls whose verb matches.
    pub fn call_count(&self, verb: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(verb))
            .count()
    }

    /// Queue an error for the next `create` call.
    pub fn push_create_error(&self, err: RuntimeError) {
        self.inner.lock().create_errors.push_back(err);
    }

    /// Queue an error for the next `start` call.
    pub fn push_start_error(&self, err: RuntimeError) {
        self.inner.lock().start_errors.push_back(err);
    }

    /// Queue an error for the next `stop` call.
    pub fn push_stop_error(&self, err: RuntimeError) {
        self.inner.lock().stop_errors.push_back(err);
    }

    /// Delay `create` calls, for overlapping-operation tests.
    pub fn set_create_delay(&self, delay: Duration) {
        self.inner.lock().create_delay = Some(delay);
    }

    /// Simulate a container being removed behind the engine's back.
    pub fn remove_externally(&self, container: &ContainerRef) {
        self.inner.lock().containers.remove(container.as_str());
    }

    /// Register a container the engine knows nothing about (orphan).
    pub fn add_orphan(&self, name: &str) {
        self.inner
            .lock()
            .containers
            .insert(name.to_string(), FakeContainer { running: true });
    }

    /// True if the container currently exists in the fake engine.
    pub fn container_exists(&self, container: &ContainerRef) -> bool {
        self.inner.lock().containers.contains_key(container.as_str())
    }

    fn log(&self, entry: String) {
        self.inner.lock().calls.push(entry);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerRef, RuntimeError> {
        self.log(format!("create {}", spec.name));
        let delay = self.inner.lock().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.inner.lock().create_errors.pop_front() {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        if inner.containers.contains_key(&spec.name) {
            return Err(RuntimeError::permanent(format!(
                "conflict: container name {} already in use",
                spec.name
            )));
        }
        inner.containers.insert(spec.name.clone(), FakeContainer { running: false });
        Ok(ContainerRef(spec.name.clone()))
    }

    async fn start(&self, container: &ContainerRef) -> Result<(), RuntimeError> {
        self.log(format!("start {}", container));
        if let Some(err) = self.inner.lock().start_errors.pop_front() {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        match inner.containers.get_mut(container.as_str()) {
            Some(c) => {
                c.running = true;
                Ok(())
            }
            None => Err(RuntimeError::permanent(format!("no such container: {}", container))),
        }
    }

    async fn exec(
        &self,
        container: &ContainerRef,
        command: &str,
        cancel: CancellationToken,
    ) -> Result<ExecStream, RuntimeError> {
        self.log(format!("exec {} {}", container, command));
        {
            let inner = self.inner.lock();
            match inner.containers.get(container.as_str()) {
                Some(c) if c.running => {}
                Some(_) => {
                    return Err(RuntimeError::permanent(format!(
                        "container {} is not running",
                        container
                    )))
                }
                None => {
                    return Err(RuntimeError::permanent(format!(
                        "no such container: {}",
                        container
                    )))
                }
            }
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(16);
        let (exit_tx, exit_rx) = oneshot::channel();
        let command = command.to_string();

        tokio::spawn(async move {
            let run = run_fake_command(&command, chunk_tx);
            tokio::select! {
                code = run => {
                    let _ = exit_tx.send(Ok(code));
                }
                _ = cancel.cancelled() => {
                    // Terminated: exit sender dropped, stream just ends
                }
            }
        });

        Ok(ExecStream { chunks: chunk_rx, exit: exit_rx })
    }

    async fn stop(&self, container: &ContainerRef, _grace: Duration) -> Result<(), RuntimeError> {
        self.log(format!("stop {}", container));
        if let Some(err) = self.inner.lock().stop_errors.pop_front() {
            return Err(err);
        }
        let mut inner = self.inner.lock();
        if let Some(c) = inner.containers.get_mut(container.as_str()) {
            c.running = false;
        }
        // Stopping a stopped or missing container is idempotent success
        Ok(())
    }

    async fn remove(&self, container: &ContainerRef) -> Result<(), RuntimeError> {
        self.log(format!("remove {}", container));
        self.inner.lock().containers.remove(container.as_str());
        Ok(())
    }

    async fn inspect(&self, container: &ContainerRef) -> Result<ContainerStatus, RuntimeError> {
        self.log(format!("inspect {}", container));
        let inner = self.inner.lock();
        Ok(match inner.containers.get(container.as_str()) {
            Some(c) if c.running => ContainerStatus::Running,
            Some(_) => ContainerStatus::Exited,
            None => ContainerStatus::Missing,
        })
    }

    async fn list(&self, name_prefix: &str) -> Result<Vec<ContainerRef>, RuntimeError> {
        self.log(format!("list {}", name_prefix));
        let inner = self.inner.lock();
        let mut names: Vec<_> = inner
            .containers
            .keys()
            .filter(|n| n.starts_with(name_prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names.into_iter().map(ContainerRef).collect())
    }
}

/// Interpret the fake command vocabulary. Returns the exit code.
async fn run_fake_command(command: &str, chunks: mpsc::Sender<ExecChunk>) -> i64 {
    let mut parts = command.splitn(2, ' ');
    let verb = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("");
    match verb {
        "echo" => {
            let _ = chunks.send(ExecChunk::Stdout(format!("{}\n", rest))).await;
            0
        }
        "stderr" => {
            let _ = chunks.send(ExecChunk::Stderr(format!("{}\n", rest))).await;
            0
        }
        "exit" => rest.trim().parse().unwrap_or(1),
        "sleep" => {
            let secs: f64 = rest.trim().parse().unwrap_or(0.0);
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
            0
        }
        _ => 0,
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
