//! Harness configuration.
//!
//! Loaded from YAML or JSON (by file extension), then optionally
//! overridden from `PROBAR_*` environment variables.
//!
//! ```yaml
//! wait:
//!   timeout_ms: 10000
//!   poll_interval_ms: 100
//!   condition_errors: lenient
//! retry_attempts: 3
//! load_time_ms: 250
//! ```

use crate::result::{WaitError, WaitResult};
use crate::retry::DEFAULT_MAX_ATTEMPTS;
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Overrides `wait.timeout_ms`
pub const ENV_WAIT_TIMEOUT_MS: &str = "PROBAR_WAIT_TIMEOUT_MS";
/// Overrides `wait.poll_interval_ms`
pub const ENV_POLL_INTERVAL_MS: &str = "PROBAR_POLL_INTERVAL_MS";
/// Overrides `retry_attempts`
pub const ENV_RETRY_ATTEMPTS: &str = "PROBAR_RETRY_ATTEMPTS";
/// Overrides `load_time_ms`
pub const ENV_LOAD_TIME_MS: &str = "PROBAR_LOAD_TIME_MS";

/// Session-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Timeout and polling for every wait
    pub wait: WaitOptions,
    /// Retries after the first attempt for element operations
    pub retry_attempts: usize,
    /// Settle time after navigation and page actions
    pub load_time_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wait: WaitOptions::default(),
            retry_attempts: DEFAULT_MAX_ATTEMPTS,
            load_time_ms: 0,
        }
    }
}

impl HarnessConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set wait options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set retry attempts
    #[must_use]
    pub const fn with_retry_attempts(mut self, attempts: usize) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set settle time in milliseconds
    #[must_use]
    pub const fn with_load_time(mut self, load_time_ms: u64) -> Self {
        self.load_time_ms = load_time_ms;
        self
    }

    /// Settle time as Duration
    #[must_use]
    pub const fn load_time(&self) -> Duration {
        Duration::from_millis(self.load_time_ms)
    }

    /// Parse YAML
    pub fn from_yaml(source: &str) -> WaitResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Parse JSON
    pub fn from_json(source: &str) -> WaitResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> WaitResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&source)?,
            Some("yaml" | "yml") => Self::from_yaml(&source)?,
            other => {
                return Err(WaitError::config(format!(
                    "unsupported config extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };
        tracing::debug!(path = %path.display(), ?config, "loaded harness config");
        Ok(config)
    }

    /// Apply `PROBAR_*` overrides from the process environment
    pub fn with_env_overrides(self) -> WaitResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (keyed by the `ENV_*` names)
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> WaitResult<Self> {
        if let Some(v) = parse_override(&lookup, ENV_WAIT_TIMEOUT_MS)? {
            self.wait.timeout_ms = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.wait.poll_interval_ms = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_RETRY_ATTEMPTS)? {
            self.retry_attempts = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_LOAD_TIME_MS)? {
            self.load_time_ms = v;
        }
        Ok(self)
    }
}

fn parse_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> WaitResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| WaitError::config(format!("{key}={raw:?}: {e}")))
}
