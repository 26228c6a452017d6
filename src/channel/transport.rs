// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP transport boundary
//!
//! The channel sends exactly one JSON POST per request through a [`Transport`].
//! [`ReqwestTransport`] is the production implementation; tests inject their own.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ClientConfig, RetryConfig};

/// Longest body excerpt kept in status errors
pub const BODY_PREVIEW_CHARS: usize = 100;

/// Errors raised by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response within the request timeout
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Could not connect or the connection dropped
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Server answered with a non-2xx status
    #[error("Server responded with {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx response whose body is not the expected JSON
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    /// Request body could not be built; nothing was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// A response as seen by the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Build a response from a status and a JSON value
    pub fn json_body(status_code: u16, body: &serde_json::Value) -> Self {
        Self {
            status_code,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    /// First [`BODY_PREVIEW_CHARS`] characters of the body, lossily decoded
    pub fn body_preview(&self) -> String {
        String::from_utf8_lossy(&self.body)
            .chars()
            .take(BODY_PREVIEW_CHARS)
            .collect()
    }

    /// Convert a non-2xx response into a `Status` error
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status_code,
                body: self.body_preview(),
            })
        }
    }
}

/// Capability to POST a JSON body and get the raw reply
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one POST request
    ///
    /// Non-2xx statuses are returned as responses, not errors; only failures
    /// to obtain a response at all are `Err`.
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// Pooled keep-alive HTTP transport with status/connect retries
pub struct ReqwestTransport {
    client: Client,
    retry: RetryConfig,
}

impl ReqwestTransport {
    /// Create a transport from client configuration
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| TransportError::Connection(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            let mut request = self
                .client
                .post(url)
                .timeout(timeout)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(body);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            debug!("POST {} (attempt {})", url, attempt + 1);
            match request.send().await {
                Ok(response) => {
                    let status_code = response.status().as_u16();
                    if self.retry.should_retry_status(status_code)
                        && attempt < self.retry.max_retries
                    {
                        let delay = self.retry.backoff(attempt);
                        warn!(
                            "Server returned {}, retrying in {:?} ({}/{})",
                            status_code,
                            delay,
                            attempt + 1,
                            self.retry.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.bytes().await.map_err(|e| map_reqwest_error(e, timeout))?;
                    return Ok(RawResponse {
                        status_code,
                        body: body.to_vec(),
                    });
                }
                Err(e) if e.is_connect() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Connection to {} failed ({}), retrying in {:?} ({}/{})",
                        url,
                        e,
                        delay,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(map_reqwest_error(e, timeout)),
            }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else {
        TransportError::Connection(err.to_string())
    }
}
