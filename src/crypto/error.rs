// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error taxonomy for the handshake and the envelope codec.
//!
//! ## Error Variants
//!
//! - **InvalidRemoteKey**: server public key is not valid base64 or not a valid P-256 point
//! - **KeyAgreement**: ECDH produced a degenerate shared point
//! - **Encode**: payload could not be serialized, compressed or encrypted (local bug)
//! - **MalformedEnvelope**: envelope is not base64 or shorter than nonce + tag
//! - **AuthenticationFailed**: AES-GCM tag did not verify (wrong key or tampered data)
//! - **Decompression**: tag verified but the zlib stream is corrupt (protocol mismatch)
//! - **InvalidPayload**: decompressed plaintext is not the expected JSON shape
//!
//! Only the last four can come out of `decode`; they all mean the session key is
//! presumed desynchronized.

use thiserror::Error;

/// Errors produced by key agreement and the envelope codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The remote public key could not be decoded into a point on P-256
    #[error("Invalid remote public key: {reason}")]
    InvalidRemoteKey { reason: String },

    /// ECDH yielded the identity element
    #[error("Key agreement failed: {reason}")]
    KeyAgreement { reason: String },

    /// Serialization, compression or encryption of an outgoing payload failed
    #[error("Encoding failed during {stage}: {reason}")]
    Encode { stage: &'static str, reason: String },

    /// Envelope too short or not valid base64
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// Authentication tag verification failed
    #[error("Authentication failed: envelope tag did not verify")]
    AuthenticationFailed,

    /// Authenticated bytes did not inflate
    #[error("Decompression failed: {reason}")]
    Decompression { reason: String },

    /// Inflated bytes are not the expected payload
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

impl CryptoError {
    /// True for failures that can only come from decoding a received envelope
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::MalformedEnvelope { .. }
                | CryptoError::AuthenticationFailed
                | CryptoError::Decompression { .. }
                | CryptoError::InvalidPayload { .. }
        )
    }

    /// True for failures raised while establishing a session
    pub fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidRemoteKey { .. } | CryptoError::KeyAgreement { .. }
        )
    }
}

// Conversion from p256 errors (point decoding)
impl From<p256::elliptic_curve::Error> for CryptoError {
    fn from(err: p256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidRemoteKey {
            reason: format!("p256 error: {}", err),
        }
    }
}
