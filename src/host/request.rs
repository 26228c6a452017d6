// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Host-side request inputs and their validation

use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::client::clamp_timeout_secs;
use crate::crypto::RequestPayload;

/// Accepted `max_tokens` range
pub const MIN_MAX_TOKENS: u32 = 64;
pub const MAX_MAX_TOKENS: u32 = 4096;

/// Raw inputs as supplied by the host
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionRequest {
    pub server_url: String,
    pub api_key: String,
    pub server_public_key: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub seed: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
}

/// Sanitized request ready for a channel
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub server_url: String,
    pub api_key: String,
    pub server_public_key: String,
    pub payload: RequestPayload,
    pub timeout: Duration,
}

/// Input problems caught before any network call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Server URL and API key are required")]
    MissingCredentials,

    #[error("Server public key is required")]
    MissingPublicKey,

    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("max_tokens must be between 64 and 4096, got {0}")]
    MaxTokensOutOfRange(u32),

    #[error("temperature must be between 0.0 and 1.0, got {0}")]
    TemperatureOutOfRange(f64),
}

impl ExpansionRequest {
    /// Trim and validate inputs
    ///
    /// The public key is only required when `encrypted` is set.
    pub fn prepare(&self, encrypted: bool) -> Result<PreparedRequest, InputError> {
        let server_url = self.server_url.trim().trim_end_matches('/').to_string();
        let api_key = self.api_key.trim().to_string();
        if server_url.is_empty() || api_key.is_empty() {
            return Err(InputError::MissingCredentials);
        }

        let parsed = Url::parse(&server_url).map_err(|e| InputError::InvalidUrl {
            url: server_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(InputError::InvalidUrl {
                url: server_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let server_public_key = self.server_public_key.trim().to_string();
        if encrypted && server_public_key.is_empty() {
            return Err(InputError::MissingPublicKey);
        }

        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            return Err(InputError::MaxTokensOutOfRange(self.max_tokens));
        }
        if !self.temperature.is_finite() || !(0.0..=1.0).contains(&self.temperature) {
            return Err(InputError::TemperatureOutOfRange(self.temperature));
        }

        let system_prompt = self
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(PreparedRequest {
            server_url,
            api_key,
            server_public_key,
            payload: RequestPayload {
                system_prompt,
                prompt: self.prompt.clone(),
                seed: self.seed,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            },
            timeout: Duration::from_secs(clamp_timeout_secs(self.timeout_secs)),
        })
    }
}
