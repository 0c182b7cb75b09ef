//! Engine configuration.
//!
//! Tunables for the debounce window and external dispatch timeout, plus the
//! base URL of the rule store service. Loadable from YAML; every field has a
//! default so an empty document is a valid configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default quiescence window for interactive edits (ms)
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default timeout for external resolve/validate dispatches (ms)
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 10_000;

/// Engine tunables, shared by the resolver, validator, and session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiescence window applied to interactive edits before dispatching
    pub debounce_ms: u64,

    /// Upper bound on any external resolve/validate call; a dispatch that
    /// does not return within this window becomes an error outcome, never
    /// an indefinite pending state
    pub dispatch_timeout_ms: u64,

    /// Base URL of the rule store service (for `HttpRuleStore`)
    pub service_base_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            dispatch_timeout_ms: DEFAULT_DISPATCH_TIMEOUT_MS,
            service_base_url: None,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse engine configuration YAML")
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine configuration {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    /// Debounce window as a `Duration`
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Dispatch timeout as a `Duration`
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}
