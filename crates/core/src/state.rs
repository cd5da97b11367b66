// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace lifecycle state machine.
//!
//! The state set is closed and transitions are validated by
//! [`WorkspaceState::check_transition`]; callers that hold a workspace's
//! operation lock apply transitions through the lifecycle controller, which
//! rejects anything outside the diagram:
//!
//! ```text
//! Pending -> Creating -> Running <-> Busy
//! Creating -> Failed
//! Running/Busy -> Stopping -> Stopped | Failed
//! Stopped/Failed -> Removed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// State of a workspace in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceState {
    /// Registered but no runtime work started yet
    #[default]
    Pending,
    /// Container creation/start in progress
    Creating,
    /// Backing container is up and idle
    Running,
    /// A command is executing inside the container
    Busy,
    /// Graceful stop in progress
    Stopping,
    /// Container stopped, record and workdir retained
    Stopped,
    /// Creation or stop failed
    Failed {
        /// Reason for the failure
        reason: String,
    },
    /// Tombstone: container and workdir deleted, record retained
    Removed,
}

/// Invalid transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {from} -> {to}")]
pub struct StateError {
    pub from: String,
    pub to: String,
}

impl WorkspaceState {
    /// Terminal states accept no further lifecycle operations except `remove`
    /// (for `Stopped`/`Failed`) and tombstone purge (for `Removed`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkspaceState::Stopped | WorkspaceState::Failed { .. } | WorkspaceState::Removed
        )
    }

    /// States in which the record must carry a container ref.
    pub fn holds_container(&self) -> bool {
        matches!(
            self,
            WorkspaceState::Running
                | WorkspaceState::Busy
                | WorkspaceState::Stopping
                | WorkspaceState::Stopped
        )
    }

    /// Short lowercase label (for logs and list filters).
    pub fn label(&self) -> &'static str {
        match self {
            WorkspaceState::Pending => "pending",
            WorkspaceState::Creating => "creating",
            WorkspaceState::Running => "running",
            WorkspaceState::Busy => "busy",
            WorkspaceState::Stopping => "stopping",
            WorkspaceState::Stopped => "stopped",
            WorkspaceState::Failed { .. } => "failed",
            WorkspaceState::Removed => "removed",
        }
    }

    /// Validate a transition against the lifecycle diagram.
    ///
    /// Returns the target state so callers can assign it in one expression.
    pub fn check_transition(&self, to: WorkspaceState) -> Result<WorkspaceState, StateError> {
        use WorkspaceState::*;
        let ok = match (self, &to) {
            (Pending, Creating) => true,
            (Creating, Running) => true,
            (Creating, Failed { .. }) => true,
            (Running, Busy) => true,
            (Busy, Running) => true,
            (Running, Stopping) | (Busy, Stopping) => true,
            (Stopping, Stopped) => true,
            (Stopping, Failed { .. }) => true,
            (Stopped, Removed) | (Failed { .. }, Removed) => true,
            _ => false,
        };
        if ok {
            Ok(to)
        } else {
            Err(StateError { from: self.label().to_string(), to: to.label().to_string() })
        }
    }
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceState::Failed { reason } => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.label()),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
