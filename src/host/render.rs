// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Display strings for the host
//!
//! The host shows a single line of text. Failures are prefixed with a symbol
//! indicating severity so they stand out from generated text.

use crate::channel::{ChannelError, TransportError};
use crate::crypto::{CryptoError, ResponsePayload};

use super::request::InputError;

/// Text shown for a successful reply
pub fn render_response(response: &ResponsePayload) -> String {
    let text = response.result.trim();
    if text.is_empty() {
        "⚠️ Server returned an empty response.".to_string()
    } else {
        text.to_string()
    }
}

pub fn render_input_error(err: &InputError) -> String {
    format!("❌ {}.", err)
}

pub fn render_transport_error(err: &TransportError) -> String {
    match err {
        TransportError::Timeout { timeout_secs } => format!(
            "⏱️ Timeout: server did not respond within {} seconds.",
            timeout_secs
        ),
        TransportError::Connection(_) => {
            "🔌 Connection failed: check the server URL and that the server is running."
                .to_string()
        }
        TransportError::Status { status: 403, .. } => {
            "⛔ Security error: API key was rejected.".to_string()
        }
        TransportError::Status { status: 404, .. } => {
            "❌ Server error: endpoint not found (404).".to_string()
        }
        TransportError::Status { status, body } => {
            format!("❌ Server responded with {}: {}", status, body)
        }
        TransportError::InvalidResponse(reason) => {
            format!("❌ Unexpected server response: {}", reason)
        }
        TransportError::InvalidRequest(reason) => {
            format!("❌ Could not build request: {}", reason)
        }
    }
}

pub fn render_channel_error(err: &ChannelError) -> String {
    match err {
        ChannelError::Handshake(e) => format!("🔑 Key exchange failed: {}", e),
        ChannelError::Encode(e) => format!("❌ Could not encrypt request: {}", e),
        ChannelError::Transport(e) => render_transport_error(e),
        ChannelError::Decode(CryptoError::AuthenticationFailed) => {
            "🔐 Response failed authentication; session reset, please retry.".to_string()
        }
        ChannelError::Decode(e) => {
            format!("🔐 Could not decrypt response ({}); session reset, please retry.", e)
        }
    }
}
