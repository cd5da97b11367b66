// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker runtime — drives containers through the docker CLI.
//!
//! Containers are created with `sleep infinity` as PID 1 so the workspace
//! stays up between command runs; commands go through `docker exec` with
//! stdout/stderr piped back as chunk streams. The workspace directory is
//! mounted read-write at `/workspace`, which is also the working directory.

use crate::error::RuntimeError;
use crate::runtime::{ContainerRef, ContainerRuntime, ContainerSpec, ContainerStatus, ExecStream};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use warden_core::ExecChunk;

/// Channel capacity for streamed exec output.
const EXEC_CHANNEL_CAPACITY: usize = 256;

/// Container runtime backed by the docker CLI.
#[derive(Clone)]
pub struct DockerRuntime {
    docker_bin: String,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerRuntime {
    pub fn new() -> Self {
        let docker_bin =
            std::env::var("WARDEN_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string());
        Self { docker_bin }
    }

    /// Run a docker CLI command and return stdout on success.
    async fn run_docker(&self, args: &[String]) -> Result<String, RuntimeError> {
        let output = tokio::process::Command::new(&self.docker_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| RuntimeError::transient(format!("failed to exec docker: {}", e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_stderr(
                args.first().map(String::as_str).unwrap_or(""),
                stderr.trim(),
            ))
        }
    }
}

/// Classify docker CLI stderr into transient vs permanent.
///
/// Missing objects, bad images, and name conflicts will not resolve on
/// retry; everything else (daemon busy, I/O pressure) is worth retrying.
fn classify_stderr(verb: &str, stderr: &str) -> RuntimeError {
    let lower = stderr.to_ascii_lowercase();
    let permanent = lower.contains("no such container")
        || lower.contains("no such object")
        || lower.contains("no such image")
        || lower.contains("not found")
        || lower.contains("conflict")
        || lower.contains("invalid");
    let msg = format!("docker {} failed: {}", verb, stderr);
    if permanent {
        RuntimeError::permanent(msg)
    } else {
        RuntimeError::transient(msg)
    }
}

/// True when stderr indicates the container is already gone.
fn is_missing(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("no such container") || lower.contains("no such object")
}

/// Build `docker create` arguments for a container spec.
///
/// Kept as a pure function so argument shape is testable without docker.
pub(crate) fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--memory".to_string(),
        spec.mem_limit.clone(),
        "--cpu-quota".to_string(),
        spec.cpu_quota.to_string(),
        "-v".to_string(),
        format!("{}:/workspace", spec.work_dir.display()),
        "-w".to_string(),
        "/workspace".to_string(),
    ];
    if !spec.network_enabled {
        args.push("--network".to_string());
        args.push("none".to_string());
    }
    for (key, val) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, val));
    }
    args.push(spec.image.clone());
    args.push("sleep".to_string());
    args.push("infinity".to_string());
    args
}

/// Build `docker exec` arguments for a command.
pub(crate) fn exec_args(container: &ContainerRef, command: &str) -> Vec<String> {
    vec![
        "exec".to_string(),
        container.as_str().to_string(),
        "sh".to_string(),
        "-c".to_string(),
        command.to_string(),
    ]
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerRef, RuntimeError> {
        self.run_docker(&create_args(spec)).await?;
        tracing::info!(container = %spec.name, image = %spec.image, "container created");
        Ok(ContainerRef(spec.name.clone()))
    }

    async fn start(&self, container: &ContainerRef) -> Result<(), RuntimeError> {
        // `docker start` on a running container already returns success
        self.run_docker(&["start".to_string(), container.as_str().to_string()]).await?;
        Ok(())
    }

    async fn exec(
        &self,
        container: &ContainerRef,
        command: &str,
        cancel: CancellationToken,
    ) -> Result<ExecStream, RuntimeError> {
        let mut child = tokio::process::Command::new(&self.docker_bin)
            .args(exec_args(container, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RuntimeError::transient(format!("failed to spawn docker exec: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            RuntimeError::transient("docker exec stdout not captured".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            RuntimeError::transient("docker exec stderr not captured".to_string())
        })?;

        let (chunk_tx, chunk_rx) = mpsc::channel(EXEC_CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = oneshot::channel();

        let stderr_tx = chunk_tx.clone();
        let stdout_pump = tokio::spawn(pump_lines(stdout, chunk_tx, ExecChunk::Stdout));
        let stderr_pump = tokio::spawn(pump_lines(stderr, stderr_tx, ExecChunk::Stderr));

        let container = container.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    // Let the pumps drain remaining buffered output
                    let _ = stdout_pump.await;
                    let _ = stderr_pump.await;
                    let result = status
                        .map(|s| i64::from(s.code().unwrap_or(-1)))
                        .map_err(|e| RuntimeError::transient(format!("docker exec wait: {}", e)));
                    let _ = exit_tx.send(result);
                }
                _ = cancel.cancelled() => {
                    tracing::info!(%container, "terminating exec on cancellation");
                    if let Err(e) = child.kill().await {
                        tracing::warn!(%container, error = %e, "failed to kill docker exec");
                    }
                    // Exit sender dropped: consumer classifies the run itself
                }
            }
        });

        Ok(ExecStream { chunks: chunk_rx, exit: exit_rx })
    }

    async fn stop(&self, container: &ContainerRef, grace: Duration) -> Result<(), RuntimeError> {
        let args = vec![
            "stop".to_string(),
            "-t".to_string(),
            grace.as_secs().max(1).to_string(),
            container.as_str().to_string(),
        ];
        match self.run_docker(&args).await {
            Ok(_) => Ok(()),
            // Already gone counts as stopped
            Err(RuntimeError::Permanent(msg)) if is_missing(&msg) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, container: &ContainerRef) -> Result<(), RuntimeError> {
        let args =
            vec!["rm".to_string(), "-f".to_string(), container.as_str().to_string()];
        match self.run_docker(&args).await {
            Ok(_) => Ok(()),
            // Removing a missing container is idempotent success
            Err(RuntimeError::Permanent(msg)) if is_missing(&msg) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn inspect(&self, container: &ContainerRef) -> Result<ContainerStatus, RuntimeError> {
        let args = vec![
            "inspect".to_string(),
            "-f".to_string(),
            "{{.State.Status}}".to_string(),
            container.as_str().to_string(),
        ];
        match self.run_docker(&args).await {
            Ok(status) => Ok(parse_inspect_status(&status)),
            Err(RuntimeError::Permanent(msg)) if is_missing(&msg) => {
                Ok(ContainerStatus::Missing)
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self, name_prefix: &str) -> Result<Vec<ContainerRef>, RuntimeError> {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            format!("name={}", name_prefix),
            "--format".to_string(),
            "{{.Names}}".to_string(),
        ];
        let out = self.run_docker(&args).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ContainerRef::from)
            .collect())
    }
}

/// Map `docker inspect` status strings onto the adapter contract.
pub(crate) fn parse_inspect_status(status: &str) -> ContainerStatus {
    match status.trim() {
        "running" | "restarting" | "paused" => ContainerStatus::Running,
        _ => ContainerStatus::Exited,
    }
}

/// Pump lines from a child pipe into the chunk channel.
async fn pump_lines<R>(
    reader: R,
    tx: mpsc::Sender<ExecChunk>,
    wrap: fn(String) -> ExecChunk,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(mut line)) => {
                line.push('\n');
                if tx.send(wrap(line)).await.is_err() {
                    // Consumer gone; stop pumping
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "exec output read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
