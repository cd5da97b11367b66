// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-core: Core types for the warden workspace orchestration engine

pub mod clock;
pub mod exec;
pub mod id;
pub mod spec;
pub mod state;
pub mod workspace;

pub use clock::{Clock, FakeClock, SystemClock};
pub use exec::{ExecChunk, ExecutionResult, ExitClass, OutputTail};
pub use spec::{ResourceSpec, SpecError};
pub use state::{StateError, WorkspaceState};
pub use workspace::{ExitInfo, Workspace, WorkspaceId};
