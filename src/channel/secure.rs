// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Secure request channel
//!
//! One `send` runs a strict pipeline:
//!
//! 1. **Acquire session** from the shared [`SessionState`]
//! 2. **Encode** the request into an envelope
//! 3. **Transmit** `{client_pub, data}` with the `X-API-Key` header
//! 4. **Decode** the `{result}` envelope from the reply
//!
//! Transport and decode failures invalidate the session so the next `send`
//! re-handshakes. Nothing is retried here; callers retry whole sends.

use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::transport::{Transport, TransportError};
use crate::config::DEFAULT_ENDPOINT_PATH;
use crate::crypto::{
    decode, encode, CryptoError, RemotePublicKey, RequestPayload, ResponsePayload,
    SecureEnvelope, Session, SessionState,
};

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Failure of one `send`, tagged with the pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Server key invalid or key agreement degenerate; nothing was cached
    #[error("Handshake failed")]
    Handshake(#[source] CryptoError),

    /// Request could not be sealed; a local bug, session untouched
    #[error("Encoding failed")]
    Encode(#[source] CryptoError),

    /// Network, timeout or non-2xx status; session invalidated
    #[error("Transport failed")]
    Transport(#[source] TransportError),

    /// Reply did not authenticate or decode; session invalidated
    #[error("Decoding failed")]
    Decode(#[source] CryptoError),
}

impl ChannelError {
    /// Whether repeating the same `send` can succeed
    ///
    /// Handshake and encode failures repeat with the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::Transport(_) | ChannelError::Decode(_))
    }

    /// Whether this failure dropped the cached session
    pub fn invalidates_session(&self) -> bool {
        self.is_retryable()
    }
}

#[derive(Debug, Deserialize)]
struct EncryptedReply {
    result: Option<SecureEnvelope>,
}

/// Client end of the encrypted channel
///
/// Cheap to share behind an `Arc`; all calls share one session.
pub struct SecureChannel<T: Transport> {
    transport: Arc<T>,
    session: SessionState,
    endpoint_path: String,
}

impl<T: Transport> SecureChannel<T> {
    /// Create a channel over `transport` using `session` as the shared cache
    pub fn new(transport: Arc<T>, session: SessionState) -> Self {
        Self {
            transport,
            session,
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
        }
    }

    /// Override the relative endpoint path
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// The session cache this channel uses
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Full endpoint URL for a server base URL
    pub fn endpoint_url(&self, server_url: &str) -> String {
        format!("{}{}", server_url.trim_end_matches('/'), self.endpoint_path)
    }

    /// Send one encrypted request and decode the reply
    pub async fn send(
        &self,
        server_url: &str,
        remote_public_key: &str,
        api_key: &str,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> Result<ResponsePayload, ChannelError> {
        let remote = RemotePublicKey::parse(remote_public_key).map_err(ChannelError::Handshake)?;
        let session = self
            .session
            .get_or_refresh(&remote)
            .await
            .map_err(ChannelError::Handshake)?;

        let envelope = encode(payload, &session.shared_key).map_err(ChannelError::Encode)?;

        let reply = match self.transmit(server_url, api_key, &session, &envelope, timeout).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Transport failure, invalidating session: {}", e);
                self.session.invalidate().await;
                return Err(ChannelError::Transport(e));
            }
        };

        match Self::open_reply(reply, &session) {
            Ok(response) => {
                info!(
                    "✅ Decoded response ({} chars) from {}",
                    response.result.len(),
                    self.endpoint_url(server_url)
                );
                Ok(response)
            }
            Err(e) => {
                warn!("Response failed to decode, invalidating session: {}", e);
                self.session.invalidate().await;
                Err(ChannelError::Decode(e))
            }
        }
    }

    async fn transmit(
        &self,
        server_url: &str,
        api_key: &str,
        session: &Session,
        envelope: &SecureEnvelope,
        timeout: Duration,
    ) -> Result<EncryptedReply, TransportError> {
        let url = self.endpoint_url(server_url);
        let mut headers = HashMap::new();
        headers.insert(API_KEY_HEADER.to_string(), api_key.to_string());
        let body = json!({
            "client_pub": session.client_public_b64,
            "data": envelope,
        });

        debug!(
            "Sending {} byte envelope to {}",
            envelope.as_str().len(),
            url
        );
        let response = self
            .transport
            .post(&url, &headers, &body, timeout)
            .await?
            .error_for_status()?;
        response.json()
    }

    fn open_reply(
        reply: EncryptedReply,
        session: &Session,
    ) -> Result<ResponsePayload, CryptoError> {
        let envelope = reply.result.ok_or_else(|| CryptoError::MalformedEnvelope {
            reason: "response has no result field".to_string(),
        })?;
        decode(&envelope, &session.shared_key)
    }
}
