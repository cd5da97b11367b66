// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Every timeout the engine applies is independently configurable: command
//! timeout, stop grace, idle eviction, hard lifetime cap, and tombstone
//! retention. Paths default to the conventional layout (`./warden` state
//! dir, `./workspaces` root) and can be overridden via environment.

use std::path::PathBuf;
use std::time::Duration;

/// All knobs for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where the registry store lives
    pub state_dir: PathBuf,
    /// Root directory containing one subdirectory per workspace id
    pub workspaces_root: PathBuf,
    /// Cap on live (non-tombstone) workspaces
    pub max_workspaces: usize,
    /// Global ceiling on simultaneous create/stop operations
    pub max_concurrent_ops: usize,
    /// Default command timeout when the caller passes none
    pub command_timeout: Duration,
    /// Graceful-stop window before forced termination
    pub stop_grace: Duration,
    /// Workspaces idle longer than this are evicted by the reaper
    pub idle_timeout: Duration,
    /// Hard cap on workspace lifetime regardless of activity
    pub max_lifetime: Duration,
    /// How long Removed tombstones stay queryable before purge
    pub tombstone_retention: Duration,
    /// Reaper sweep interval
    pub reaper_interval: Duration,
    /// Max queued `run` callers per workspace (beyond the active one)
    pub exec_queue_depth: usize,
    /// Bytes of command output retained on the record
    pub output_tail_limit: usize,
    /// Retry attempts for transient runtime errors
    pub retry_attempts: u32,
    /// Base delay for exponential retry backoff
    pub retry_base_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./warden"),
            workspaces_root: PathBuf::from("./workspaces"),
            max_workspaces: 32,
            max_concurrent_ops: 4,
            command_timeout: Duration::from_secs(30),
            stop_grace: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30 * 60),
            max_lifetime: Duration::from_secs(4 * 60 * 60),
            tombstone_retention: Duration::from_secs(10 * 60),
            reaper_interval: Duration::from_secs(30),
            exec_queue_depth: 4,
            output_tail_limit: 8 * 1024,
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl EngineConfig {
    /// Defaults with path overrides from the environment
    /// (`WARDEN_STATE_DIR`, `WARDEN_WORKSPACES_ROOT`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Ok(root) = std::env::var("WARDEN_WORKSPACES_ROOT") {
            config.workspaces_root = PathBuf::from(root);
        }
        config
    }

    /// Directory for one workspace's files.
    pub fn work_dir(&self, id: &warden_core::WorkspaceId) -> PathBuf {
        self.workspaces_root.join(id.as_str())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
