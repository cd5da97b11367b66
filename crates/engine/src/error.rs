// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Callers always get a definitive status: validation and state conflicts
//! are rejected before any runtime work, transient runtime failures are
//! retried inside the controller and only surface after retries exhaust.

use thiserror::Error;
use warden_adapters::RuntimeError;
use warden_core::{SpecError, StateError, WorkspaceId};
use warden_storage::StoreError;

/// Errors surfaced to the engine's callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A workspace with this id is already registered
    #[error("workspace {0} already exists")]
    AlreadyExists(WorkspaceId),

    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),

    /// Concurrency ceiling or live-workspace cap hit
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Bad resource spec, rejected before any runtime call
    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// Operation invalid for the workspace's current state
    #[error("workspace {id} is {state}, operation requires {required}")]
    WrongState { id: WorkspaceId, state: String, required: &'static str },

    /// A command is already in flight and the caller did not opt into queuing
    #[error("workspace {0} is busy")]
    Busy(WorkspaceId),

    /// The per-workspace run queue is at capacity
    #[error("workspace {0} run queue is full")]
    Overloaded(WorkspaceId),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Runtime failure after retries (transient) or immediately (permanent)
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Internal transition rejected by the state machine
    #[error(transparent)]
    State(#[from] StateError),

    #[error("engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    pub fn wrong_state(id: WorkspaceId, state: &warden_core::WorkspaceState, required: &'static str) -> Self {
        EngineError::WrongState { id, state: state.label().to_string(), required }
    }
}
