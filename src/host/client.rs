// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Host-facing client
//!
//! Wraps the secure channel and the plain client behind calls that take raw
//! host inputs and always return a display string.

use std::sync::Arc;
use tracing::info;

use super::render::{render_channel_error, render_input_error, render_response, render_transport_error};
use super::request::ExpansionRequest;
use crate::channel::{PlainClient, ReqwestTransport, SecureChannel, Transport, TransportError};
use crate::config::ClientConfig;
use crate::crypto::SessionState;

/// Entry point for a host integration
///
/// Keep one instance for the life of the process so requests share a session.
pub struct HostClient<T: Transport> {
    secure: SecureChannel<T>,
    plain: PlainClient<T>,
}

impl HostClient<ReqwestTransport> {
    /// Build a client over the pooled HTTP transport
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> HostClient<T> {
    pub fn new(transport: Arc<T>, config: &ClientConfig) -> Self {
        let session = SessionState::with_lifetime(config.session_lifetime());
        Self {
            secure: SecureChannel::new(Arc::clone(&transport), session)
                .with_endpoint_path(config.endpoint_path.clone()),
            plain: PlainClient::new(transport).with_endpoint_path(config.endpoint_path.clone()),
        }
    }

    /// The session cache shared by encrypted requests
    pub fn session(&self) -> &SessionState {
        self.secure.session()
    }

    /// Run an encrypted request and render the outcome
    pub async fn expand(&self, request: &ExpansionRequest) -> String {
        let prepared = match request.prepare(true) {
            Ok(prepared) => prepared,
            Err(e) => return render_input_error(&e),
        };

        info!(
            "Expanding prompt via {} (seed={}, max_tokens={})",
            prepared.server_url, prepared.payload.seed, prepared.payload.max_tokens
        );
        match self
            .secure
            .send(
                &prepared.server_url,
                &prepared.server_public_key,
                &prepared.api_key,
                &prepared.payload,
                prepared.timeout,
            )
            .await
        {
            Ok(response) => render_response(&response),
            Err(e) => render_channel_error(&e),
        }
    }

    /// Run a cleartext request and render the outcome
    pub async fn expand_plain(&self, request: &ExpansionRequest) -> String {
        let prepared = match request.prepare(false) {
            Ok(prepared) => prepared,
            Err(e) => return render_input_error(&e),
        };

        match self
            .plain
            .send(
                &prepared.server_url,
                &prepared.api_key,
                &prepared.payload,
                prepared.timeout,
            )
            .await
        {
            Ok(response) => render_response(&response),
            Err(e) => render_transport_error(&e),
        }
    }
}
