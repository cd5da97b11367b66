// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-adapters: container runtime capability boundary.
//!
//! The engine never talks to a container engine directly; it goes through
//! the [`ContainerRuntime`] trait. [`DockerRuntime`] drives the docker CLI;
//! [`FakeRuntime`] (behind `test-support`) scripts runtime behavior for
//! engine tests.

pub mod docker;
pub mod error;
pub mod runtime;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use docker::DockerRuntime;
pub use error::RuntimeError;
pub use runtime::{ContainerRef, ContainerRuntime, ContainerSpec, ContainerStatus, ExecStream};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRuntime;
