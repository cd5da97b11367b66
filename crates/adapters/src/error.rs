// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime error classification.
//!
//! Every adapter failure is either `Transient` (the controller retries with
//! backoff) or `Permanent` (escalates immediately). The adapter owns the
//! classification so orchestration code never inspects engine-specific
//! error strings.

use thiserror::Error;

/// Error from a container runtime operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Engine busy, resource exhaustion — eligible for retry with backoff
    #[error("transient runtime error: {0}")]
    Transient(String),
    /// Invalid image, missing container — not retried
    #[error("permanent runtime error: {0}")]
    Permanent(String),
}

impl RuntimeError {
    pub fn transient(msg: impl Into<String>) -> Self {
        RuntimeError::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        RuntimeError::Permanent(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RuntimeError::Transient(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
