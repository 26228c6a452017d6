// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cleartext client
//!
//! Same endpoint and API key header as the secure channel, but the request
//! and reply travel as plain JSON. For servers started without encryption;
//! anyone on the path can read and alter the traffic.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::secure::API_KEY_HEADER;
use super::transport::{Transport, TransportError};
use crate::config::DEFAULT_ENDPOINT_PATH;
use crate::crypto::{EnvelopePayload, RequestPayload, ResponsePayload};

#[derive(Debug, Deserialize)]
struct PlainReply {
    #[serde(default)]
    result: String,
}

/// Unencrypted request client
pub struct PlainClient<T: Transport> {
    transport: Arc<T>,
    endpoint_path: String,
}

impl<T: Transport> PlainClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
        }
    }

    /// Override the relative endpoint path
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// Post the payload as JSON and return the `result` field
    pub async fn send(
        &self,
        server_url: &str,
        api_key: &str,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> Result<ResponsePayload, TransportError> {
        let url = format!("{}{}", server_url.trim_end_matches('/'), self.endpoint_path);
        let mut headers = HashMap::new();
        headers.insert(API_KEY_HEADER.to_string(), api_key.to_string());
        payload.validate().map_err(TransportError::InvalidRequest)?;
        let body = serde_json::to_value(payload)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        debug!("Sending plaintext request to {}", url);
        let reply: PlainReply = self
            .transport
            .post(&url, &headers, &body, timeout)
            .await?
            .error_for_status()?
            .json()?;

        Ok(ResponsePayload {
            result: reply.result,
        })
    }
}
