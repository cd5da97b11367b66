// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution results and streamed output chunks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One chunk of streamed command output, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecChunk {
    Stdout(String),
    Stderr(String),
}

impl ExecChunk {
    pub fn as_str(&self) -> &str {
        match self {
            ExecChunk::Stdout(s) | ExecChunk::Stderr(s) => s,
        }
    }
}

/// How a command run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitClass {
    /// Command ran to completion with this exit code
    Exited(i64),
    /// Command exceeded its timeout and was terminated
    Timeout,
    /// Caller cancelled the run before completion
    Cancelled,
    /// Runtime-level failure while executing
    Error(String),
}

impl ExitClass {
    /// Exit code when the command actually exited.
    pub fn code(&self) -> Option<i64> {
        match self {
            ExitClass::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitClass::Exited(0))
    }
}

impl fmt::Display for ExitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitClass::Exited(code) => write!(f, "exited({})", code),
            ExitClass::Timeout => write!(f, "timeout"),
            ExitClass::Cancelled => write!(f, "cancelled"),
            ExitClass::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// Bounded tail of interleaved command output.
///
/// Keeps the last `limit` bytes; earlier output is dropped from the front so
/// diagnostics retained on the workspace record stay small.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTail {
    buf: String,
    limit: usize,
    truncated: bool,
}

impl OutputTail {
    pub fn new(limit: usize) -> Self {
        Self { buf: String::new(), limit, truncated: false }
    }

    pub fn push(&mut self, chunk: &ExecChunk) {
        self.buf.push_str(chunk.as_str());
        if self.buf.len() > self.limit {
            let cut = self.buf.len() - self.limit;
            // Keep the cut on a char boundary
            let mut cut = cut;
            while !self.buf.is_char_boundary(cut) {
                cut += 1;
            }
            self.buf.drain(..cut);
            self.truncated = true;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Final result of a command run inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub class: ExitClass,
    /// Interleaved stdout/stderr tail, bounded by the engine's tail limit
    pub tail: OutputTail,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.class.is_success()
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
