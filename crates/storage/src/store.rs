// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-backed registry store.
//!
//! One JSON document per workspace id under `<state_dir>/registry/`. Writes
//! go to a temp file and are renamed into place, so a crash mid-write leaves
//! the previous record intact. The store is the durable half of the
//! registry; the engine layers the in-memory index and locking on top.

use serde_json;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use warden_core::{Workspace, WorkspaceId};

/// Errors from registry persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable store of workspace records, keyed by workspace id.
pub struct RegistryStore {
    dir: PathBuf,
}

impl RegistryStore {
    /// Open (and create if absent) the registry directory under `state_dir`.
    pub fn open(state_dir: &Path) -> Result<Self, StoreError> {
        let dir = state_dir.join("registry");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, id: &WorkspaceId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Persist one record atomically (temp file + rename).
    pub fn persist(&self, workspace: &Workspace) -> Result<(), StoreError> {
        let path = self.record_path(&workspace.id);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(workspace)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load every record in the registry.
    ///
    /// Records that fail to parse are logged and skipped rather than taking
    /// the whole engine down; the reconciliation pass cleans up any backing
    /// containers they leave behind.
    pub fn load_all(&self) -> Result<Vec<Workspace>, StoreError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read(&path)?;
            match serde_json::from_slice::<Workspace>(&data) {
                Ok(ws) => records.push(ws),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable registry record"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Physically delete a record (tombstone purge).
    pub fn delete(&self, id: &WorkspaceId) -> Result<(), StoreError> {
        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
