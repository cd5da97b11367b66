// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry index over the durable store.
//!
//! The registry is the single source of truth for intended state. Every
//! commit persists to disk before touching the in-memory map, and commits
//! only happen while the workspace's operation lock is held, so readers
//! never observe a state the disk doesn't have.
//!
//! Operation locks are created lazily and kept for the lifetime of the
//! record (tombstones included) to avoid lock races on ids that are being
//! concurrently created and removed. The lock entry goes away only when
//! the tombstone is purged.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use warden_core::{Workspace, WorkspaceId};
use warden_storage::{RegistryStore, StoreError};

pub(crate) type OpLock = Arc<tokio::sync::Mutex<()>>;

pub(crate) struct Registry {
    store: RegistryStore,
    records: RwLock<HashMap<WorkspaceId, Workspace>>,
    locks: Mutex<HashMap<WorkspaceId, OpLock>>,
}

impl Registry {
    /// Load all persisted records into the index.
    pub fn open(store: RegistryStore) -> Result<Self, StoreError> {
        let mut records = HashMap::new();
        for ws in store.load_all()? {
            records.insert(ws.id.clone(), ws);
        }
        tracing::info!(count = records.len(), "registry loaded");
        Ok(Self { store, records: RwLock::new(records), locks: Mutex::new(HashMap::new()) })
    }

    pub fn get(&self, id: &WorkspaceId) -> Option<Workspace> {
        self.records.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Workspace> {
        self.records.read().values().cloned().collect()
    }

    /// Count of non-tombstone records (quota input).
    pub fn live_count(&self) -> usize {
        self.records.read().values().filter(|w| !w.is_tombstone()).count()
    }

    /// The operation lock for a workspace id, created on first use.
    pub fn op_lock(&self, id: &WorkspaceId) -> OpLock {
        self.locks
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Register a brand-new record, failing if the id is taken.
    ///
    /// The existence check and the insert happen under one write lock so
    /// two concurrent creates with the same id cannot both win.
    pub fn insert_new(&self, ws: Workspace) -> Result<bool, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&ws.id) {
            return Ok(false);
        }
        self.store.persist(&ws)?;
        records.insert(ws.id.clone(), ws);
        Ok(true)
    }

    /// Persist and commit an updated record.
    ///
    /// Callers must hold the workspace's operation lock. The durable write
    /// completes before the in-memory map changes; on write failure the map
    /// is untouched, keeping reads consistent with disk.
    pub fn commit(&self, ws: Workspace) -> Result<(), StoreError> {
        self.store.persist(&ws)?;
        self.records.write().insert(ws.id.clone(), ws);
        Ok(())
    }

    /// Physically delete a tombstoned record and its lock entry.
    pub fn purge(&self, id: &WorkspaceId) -> Result<(), StoreError> {
        self.store.delete(id)?;
        self.records.write().remove(id);
        self.locks.lock().remove(id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
