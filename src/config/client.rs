// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client configuration
//!
//! Defaults, then an optional TOML file, then `SPC_*` environment overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relative path of the expansion endpoint on the server
pub const DEFAULT_ENDPOINT_PATH: &str = "/engineer";

/// Request timeout bounds accepted from callers, in seconds
pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 300;

fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn default_session_lifetime_secs() -> u64 {
    3600
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    crate::version::user_agent()
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor_ms() -> u64 {
    300
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

/// Transport retry policy
///
/// Applies inside the HTTP transport only; the secure channel itself never
/// retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor_ms: default_backoff_factor_ms(),
            retry_statuses: default_retry_statuses(),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based): factor * 2^attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_factor_ms.saturating_mul(multiplier))
    }

    /// Whether a response status should be retried
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Configuration for the secure and plain clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    #[serde(default = "default_session_lifetime_secs")]
    pub session_lifetime_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_path: default_endpoint_path(),
            session_lifetime_secs: default_session_lifetime_secs(),
            default_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse TOML text; missing keys fall back to defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SPC_*` overrides from a lookup function
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SPC_ENDPOINT_PATH") {
            self.endpoint_path = path;
        }
        if let Some(secs) = lookup("SPC_SESSION_LIFETIME_SECS") {
            self.session_lifetime_secs = parse_var("SPC_SESSION_LIFETIME_SECS", &secs)?;
        }
        if let Some(secs) = lookup("SPC_TIMEOUT_SECS") {
            self.default_timeout_secs = parse_var("SPC_TIMEOUT_SECS", &secs)?;
        }
        if let Some(agent) = lookup("SPC_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(retries) = lookup("SPC_MAX_RETRIES") {
            self.retry.max_retries = parse_var("SPC_MAX_RETRIES", &retries)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint_path.starts_with('/') {
            return Err(anyhow!(
                "endpoint_path must start with '/', got '{}'",
                self.endpoint_path
            ));
        }
        if self.session_lifetime_secs == 0 {
            return Err(anyhow!("session_lifetime_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Session lifetime as a `Duration`
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }

    /// Default request timeout, clamped to the accepted range
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(clamp_timeout_secs(self.default_timeout_secs))
    }
}

/// Clamp a caller-supplied timeout into `MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS`
pub fn clamp_timeout_secs(secs: u64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", name, value, e))
}
