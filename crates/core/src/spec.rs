// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource specification for a workspace's backing container.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default container image for new workspaces.
pub const DEFAULT_IMAGE: &str = "python:3.11-slim";
/// Default memory limit.
pub const DEFAULT_MEM_LIMIT: &str = "512m";
/// Default CPU quota in microseconds per 100ms period.
pub const DEFAULT_CPU_QUOTA: u64 = 50_000;

/// Spec rejected before any runtime call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("image must not be empty")]
    EmptyImage,
    #[error("invalid memory limit {0:?} (expected e.g. \"512m\")")]
    BadMemLimit(String),
    #[error("invalid env key {0:?}")]
    BadEnvKey(String),
}

/// Container resource configuration, fixed at workspace creation.
///
/// Immutable after `create`; `GetWorkspace` returns it verbatim so callers
/// can audit what a workspace was provisioned with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Container image (e.g., "python:3.11-slim")
    pub image: String,
    /// Memory limit in docker syntax: digits plus b/k/m/g suffix
    pub mem_limit: String,
    /// CPU quota in microseconds per scheduling period
    pub cpu_quota: u64,
    /// Environment variables injected into the container
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Whether the container gets network access
    #[serde(default = "default_network")]
    pub network_enabled: bool,
}

fn default_network() -> bool {
    true
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            mem_limit: DEFAULT_MEM_LIMIT.to_string(),
            cpu_quota: DEFAULT_CPU_QUOTA,
            env: BTreeMap::new(),
            network_enabled: true,
        }
    }
}

impl ResourceSpec {
    pub fn with_image(image: impl Into<String>) -> Self {
        Self { image: image.into(), ..Self::default() }
    }

    /// Defaults with overrides from `WARDEN_DOCKER_IMAGE`,
    /// `WARDEN_MEM_LIMIT`, and `WARDEN_CPU_QUOTA`.
    pub fn from_env() -> Self {
        let mut spec = Self::default();
        if let Ok(image) = std::env::var("WARDEN_DOCKER_IMAGE") {
            spec.image = image;
        }
        if let Ok(mem) = std::env::var("WARDEN_MEM_LIMIT") {
            spec.mem_limit = mem;
        }
        if let Ok(quota) = std::env::var("WARDEN_CPU_QUOTA") {
            if let Ok(quota) = quota.parse() {
                spec.cpu_quota = quota;
            }
        }
        spec
    }

    /// Validate the spec. Runs before any registry or runtime work.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.image.trim().is_empty() {
            return Err(SpecError::EmptyImage);
        }
        if !valid_mem_limit(&self.mem_limit) {
            return Err(SpecError::BadMemLimit(self.mem_limit.clone()));
        }
        for key in self.env.keys() {
            if key.is_empty() || key.contains('=') {
                return Err(SpecError::BadEnvKey(key.clone()));
            }
        }
        Ok(())
    }
}

/// Accepts docker-style limits: digits followed by an optional b/k/m/g suffix.
fn valid_mem_limit(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    let digits = s.trim_end_matches(['b', 'k', 'm', 'g']);
    // At most one suffix character
    if s.len() - digits.len() > 1 {
        return false;
    }
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
