// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier and record.
//!
//! WorkspaceId is distinct from the workspace path (the workspace directory).
//! A workspace is a managed directory plus one backing container, with a
//! lifecycle independent of any single command run.

use crate::exec::{ExitClass, OutputTail};
use crate::spec::ResourceSpec;
use crate::state::WorkspaceState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a workspace instance.
    ///
    /// Workspaces outlive individual command runs; the id stays valid as a
    /// tombstone for a retention window after removal.
    pub struct WorkspaceId("wks-");
}

/// Last command's outcome, retained on the record for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub class: ExitClass,
    /// Truncated interleaved output tail
    pub tail: OutputTail,
    /// Epoch milliseconds when the command finished
    pub finished_at_ms: u64,
}

/// The registry record for one workspace.
///
/// Owned by the lifecycle controller; every state transition is persisted
/// before the workspace's operation lock is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub state: WorkspaceState,
    /// Backing container id; set exactly while `state.holds_container()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_ref: Option<String>,
    /// Resource configuration, immutable after creation
    pub spec: ResourceSpec,
    /// Per-workspace directory under the workspaces root
    pub work_dir: PathBuf,
    /// Epoch milliseconds when the record was allocated
    pub created_at_ms: u64,
    /// Updated on every successful command run; drives idle eviction
    pub last_active_at_ms: u64,
    /// Last command's exit code and output tail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_info: Option<ExitInfo>,
    /// Set when the record becomes a tombstone; drives retention purge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at_ms: Option<u64>,
}

impl Workspace {
    /// Allocate a fresh `Pending` record.
    pub fn new(id: WorkspaceId, spec: ResourceSpec, work_dir: PathBuf, now_ms: u64) -> Self {
        Self {
            id,
            state: WorkspaceState::Pending,
            container_ref: None,
            spec,
            work_dir,
            created_at_ms: now_ms,
            last_active_at_ms: now_ms,
            exit_info: None,
            removed_at_ms: None,
        }
    }

    /// True once the record is a purgeable tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.state == WorkspaceState::Removed
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
