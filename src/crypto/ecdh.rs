// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange Implementation
//!
//! Ephemeral-static Elliptic Curve Diffie-Hellman on P-256. The client generates
//! a fresh key pair per handshake and combines it with the server's public key;
//! the symmetric key is SHA-256 of the shared point's x-coordinate.
//!
//! The derivation mixes in no salt, label or transcript, so a given
//! (ephemeral secret, server key) pair always yields the same key. The server
//! derives keys the same way, so changing this breaks interoperability.

use base64::{engine::general_purpose::STANDARD, Engine};
use p256::{
    elliptic_curve::{group::Group, sec1::ToEncodedPoint},
    PublicKey, SecretKey,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::CryptoError;

/// Length of the derived symmetric key in bytes
pub const SHARED_KEY_LEN: usize = 32;

/// Length of a SEC1 uncompressed P-256 point (`0x04 || X || Y`)
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// 256-bit symmetric key derived from an ECDH exchange
///
/// Zeroized on drop. `Debug` never prints the key bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; SHARED_KEY_LEN]);

impl SharedKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; SHARED_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes
    pub fn as_bytes(&self) -> &[u8; SHARED_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

/// Server public key, validated on construction
///
/// Accepts base64 of a 65-byte uncompressed SEC1 point or of the 64-byte
/// raw `X || Y` form. Whitespace anywhere in the text is ignored so keys
/// pasted from a terminal still parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemotePublicKey {
    key: PublicKey,
    fingerprint: String,
}

impl RemotePublicKey {
    /// Decode and validate a base64 remote key
    ///
    /// # Errors
    ///
    /// `InvalidRemoteKey` if the text is not base64, has the wrong length, or
    /// the point is not on the curve.
    pub fn parse(text: &str) -> Result<Self, CryptoError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(CryptoError::InvalidRemoteKey {
                reason: "remote public key is empty".to_string(),
            });
        }

        let raw = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| CryptoError::InvalidRemoteKey {
                reason: format!("base64 decode error: {}", e),
            })?;
        let sec1 = match raw.len() {
            UNCOMPRESSED_POINT_LEN if raw[0] == 0x04 => raw,
            64 => {
                let mut prefixed = Vec::with_capacity(UNCOMPRESSED_POINT_LEN);
                prefixed.push(0x04);
                prefixed.extend_from_slice(&raw);
                prefixed
            }
            len => {
                return Err(CryptoError::InvalidRemoteKey {
                    reason: format!(
                        "expected 65-byte uncompressed or 64-byte raw point, got {} bytes",
                        len
                    ),
                })
            }
        };

        // Rejects off-curve points and the identity encoding
        let key = PublicKey::from_sec1_bytes(&sec1)?;
        let fingerprint = hex::encode(Sha256::digest(&sec1));

        Ok(Self { key, fingerprint })
    }

    /// Lowercase hex SHA-256 of the uncompressed point
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The validated curve point
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }
}

/// Encode a public key as base64 of its uncompressed SEC1 point
pub fn encode_public_key(key: &PublicKey) -> String {
    STANDARD.encode(key.to_encoded_point(false).as_bytes())
}

/// Derive the shared symmetric key from a local secret and a peer public key
///
/// Computes `local * remote`, rejects the identity element, and hashes the
/// big-endian 32-byte x-coordinate with SHA-256. The same function serves
/// both sides of the exchange.
pub fn derive_shared_key(
    local_secret: &SecretKey,
    remote: &PublicKey,
) -> Result<SharedKey, CryptoError> {
    let shared_point = remote.to_projective() * *local_secret.to_nonzero_scalar();
    if bool::from(shared_point.is_identity()) {
        return Err(CryptoError::KeyAgreement {
            reason: "shared point is the identity element".to_string(),
        });
    }

    let encoded = shared_point.to_affine().to_encoded_point(false);
    let x = encoded.x().ok_or_else(|| CryptoError::KeyAgreement {
        reason: "shared point has no x-coordinate".to_string(),
    })?;

    let mut key = [0u8; SHARED_KEY_LEN];
    key.copy_from_slice(&Sha256::digest(x));
    Ok(SharedKey(key))
}

/// Perform one client-side handshake against a remote public key
///
/// Generates a fresh ephemeral key pair, derives the shared key, and returns
/// it with the client's uncompressed public point. The ephemeral secret is
/// dropped before returning.
pub fn handshake(remote: &RemotePublicKey) -> Result<(SharedKey, Vec<u8>), CryptoError> {
    let ephemeral = SecretKey::random(&mut OsRng);
    let shared_key = derive_shared_key(&ephemeral, remote.public_key())?;
    let client_public = ephemeral
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();

    Ok((shared_key, client_public))
}
