// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-engine: workspace lifecycle orchestration.
//!
//! The [`Engine`] is the single explicitly-constructed context object: it
//! owns the registry, the runtime handle, the lifecycle controller, the
//! command executor, and the reaper task. The API layer calls the engine;
//! nothing in here parses requests or speaks HTTP.

mod config;
mod controller;
mod engine;
mod error;
mod executor;
mod reaper;
mod reconcile;
mod registry;

pub use config::EngineConfig;
pub use engine::{Engine, ListFilter, StreamedRun};
pub use error::EngineError;

/// Container name prefix for every workspace this engine manages.
///
/// Doubles as the orphan-detection filter: any runtime container with this
/// prefix and no live registry record is eligible for forced removal.
pub const CONTAINER_PREFIX: &str = "warden-";

/// Deterministic container name for a workspace id.
pub(crate) fn container_name(id: &warden_core::WorkspaceId) -> String {
    format!("{}{}", CONTAINER_PREFIX, id)
}
