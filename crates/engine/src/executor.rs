// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command executor — runs a command inside a Running workspace.
//!
//! Holds the workspace's operation lock for the duration of the run, so a
//! second caller gets `Busy` (or queues, bounded) instead of interleaving.
//! The workspace itself survives timeouts and cancellations; only
//! stop/remove end its life.

use crate::config::EngineConfig;
use crate::controller::LifecycleController;
use crate::error::EngineError;
use crate::registry::Registry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use warden_core::{
    Clock, ExecChunk, ExecutionResult, ExitClass, ExitInfo, OutputTail, WorkspaceId,
    WorkspaceState,
};

/// One occupied waiter slot in the per-workspace exec queue. Decrements the
/// count on drop, whether the waiter acquired the lock or was cancelled.
struct QueueSlot<'a> {
    waiting: &'a Mutex<HashMap<WorkspaceId, usize>>,
    id: &'a WorkspaceId,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        let mut waiting = self.waiting.lock();
        if let Some(depth) = waiting.get_mut(self.id) {
            *depth = depth.saturating_sub(1);
            if *depth == 0 {
                waiting.remove(self.id);
            }
        }
    }
}

pub(crate) struct CommandExecutor<C: Clock> {
    registry: Arc<Registry>,
    controller: Arc<LifecycleController<C>>,
    config: Arc<EngineConfig>,
    clock: C,
    /// Cancellation token per in-flight run, for `cancel` and shutdown
    active: Mutex<HashMap<WorkspaceId, CancellationToken>>,
    /// Callers currently waiting on a workspace's operation lock
    waiting: Mutex<HashMap<WorkspaceId, usize>>,
}

impl<C: Clock> CommandExecutor<C> {
    pub fn new(
        registry: Arc<Registry>,
        controller: Arc<LifecycleController<C>>,
        config: Arc<EngineConfig>,
        clock: C,
    ) -> Self {
        Self {
            registry,
            controller,
            config,
            clock,
            active: Mutex::new(HashMap::new()),
            waiting: Mutex::new(HashMap::new()),
        }
    }

    /// Run a command to completion, returning the classified result.
    ///
    /// `queue=false` callers get `Busy` when a run is already in flight;
    /// `queue=true` callers wait in a bounded per-workspace queue and get
    /// `Overloaded` past the bound.
    pub async fn run(
        &self,
        id: &WorkspaceId,
        command: &str,
        timeout: Option<Duration>,
        queue: bool,
    ) -> Result<ExecutionResult, EngineError> {
        self.run_inner(id, command, timeout, queue, None).await
    }

    /// As [`run`], forwarding chunks to `forward` as they arrive.
    pub async fn run_forwarding(
        &self,
        id: &WorkspaceId,
        command: &str,
        timeout: Option<Duration>,
        queue: bool,
        forward: mpsc::Sender<ExecChunk>,
    ) -> Result<ExecutionResult, EngineError> {
        self.run_inner(id, command, timeout, queue, Some(forward)).await
    }

    /// Cancel an in-flight run. Returns false if none was in flight.
    pub fn cancel(&self, id: &WorkspaceId) -> bool {
        match self.active.lock().get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Ids with a run currently in flight.
    pub fn active_runs(&self) -> Vec<WorkspaceId> {
        self.active.lock().keys().cloned().collect()
    }

    /// Cancel every in-flight run (shutdown drain).
    pub fn cancel_all(&self) {
        for token in self.active.lock().values() {
            token.cancel();
        }
    }

    async fn run_inner(
        &self,
        id: &WorkspaceId,
        command: &str,
        timeout: Option<Duration>,
        queue: bool,
        forward: Option<mpsc::Sender<ExecChunk>>,
    ) -> Result<ExecutionResult, EngineError> {
        let ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if ws.is_tombstone() {
            return Err(EngineError::NotFound(id.clone()));
        }

        let lock = self.registry.op_lock(id);
        let _guard = match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) if !queue => return Err(EngineError::Busy(id.clone())),
            Err(_) => {
                // Bounded queue: count waiters, reject past the bound
                {
                    let mut waiting = self.waiting.lock();
                    let depth = waiting.entry(id.clone()).or_insert(0);
                    if *depth >= self.config.exec_queue_depth {
                        if *depth == 0 {
                            waiting.remove(id);
                        }
                        return Err(EngineError::Overloaded(id.clone()));
                    }
                    *depth += 1;
                }
                // The slot is held until the lock is acquired; if the caller
                // is dropped mid-wait (timeout, shutdown), Drop returns it.
                let slot = QueueSlot { waiting: &self.waiting, id };
                let guard = lock.lock_owned().await;
                drop(slot);
                guard
            }
        };

        // State check under the lock; Busy is impossible here because the
        // previous run released the lock only after returning to Running.
        let ws = self.registry.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if ws.state != WorkspaceState::Running {
            return Err(EngineError::wrong_state(id.clone(), &ws.state, "running"));
        }
        let container = ws
            .container_ref
            .clone()
            .ok_or_else(|| EngineError::wrong_state(id.clone(), &ws.state, "running"))?;

        self.controller.begin_command(id)?;

        let token = CancellationToken::new();
        self.active.lock().insert(id.clone(), token.clone());

        let outcome = self
            .drive(id, &container, command, timeout, token.clone(), forward)
            .await;

        self.active.lock().remove(id);

        // Whatever happened, the workspace returns to Running and the
        // outcome lands on the record before the lock releases.
        match outcome {
            Ok((class, tail, duration_ms)) => {
                let exit_info = ExitInfo {
                    class: class.clone(),
                    tail: tail.clone(),
                    finished_at_ms: self.clock.epoch_ms(),
                };
                self.controller.finish_command(id, exit_info)?;
                tracing::info!(
                    workspace_id = %id,
                    class = %class,
                    duration_ms,
                    "command finished"
                );
                Ok(ExecutionResult { class, tail, duration_ms })
            }
            Err(e) => {
                let exit_info = ExitInfo {
                    class: ExitClass::Error(e.to_string()),
                    tail: OutputTail::new(self.config.output_tail_limit),
                    finished_at_ms: self.clock.epoch_ms(),
                };
                self.controller.finish_command(id, exit_info)?;
                Err(e)
            }
        }
    }

    /// Stream the command to completion: returns the exit classification,
    /// the output tail, and the wall-clock duration.
    async fn drive(
        &self,
        id: &WorkspaceId,
        container: &str,
        command: &str,
        timeout: Option<Duration>,
        token: CancellationToken,
        forward: Option<mpsc::Sender<ExecChunk>>,
    ) -> Result<(ExitClass, OutputTail, u64), EngineError> {
        let timeout = timeout.unwrap_or(self.config.command_timeout);
        let started = self.clock.now();

        let mut stream = self
            .controller
            .runtime
            .exec(&container.into(), command, token.clone())
            .await?;

        let mut tail = OutputTail::new(self.config.output_tail_limit);
        let deadline = tokio::time::Instant::now() + timeout;
        let mut chunks_open = true;

        let class = loop {
            tokio::select! {
                maybe = stream.chunks.recv(), if chunks_open => match maybe {
                    Some(chunk) => {
                        tail.push(&chunk);
                        if let Some(ref tx) = forward {
                            let _ = tx.send(chunk).await;
                        }
                    }
                    None => chunks_open = false,
                },
                exit = &mut stream.exit => {
                    break match exit {
                        Ok(Ok(code)) => ExitClass::Exited(code),
                        Ok(Err(e)) => ExitClass::Error(e.to_string()),
                        // Sender dropped: the run was terminated
                        Err(_) => ExitClass::Cancelled,
                    };
                }
                () = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(workspace_id = %id, ?timeout, "command timed out");
                    token.cancel();
                    break ExitClass::Timeout;
                }
                () = token.cancelled() => {
                    tracing::info!(workspace_id = %id, "command cancelled");
                    break ExitClass::Cancelled;
                }
            }
        };

        // Collect whatever output is already buffered
        while let Ok(chunk) = stream.chunks.try_recv() {
            tail.push(&chunk);
            if let Some(ref tx) = forward {
                let _ = tx.send(chunk).await;
            }
        }

        let duration_ms = (self.clock.now() - started).as_millis() as u64;
        Ok((class, tail, duration_ms))
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
