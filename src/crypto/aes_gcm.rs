// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Envelope Codec (AES-256-GCM over zlib)
//!
//! Encodes request payloads into the wire envelope shared with the expansion
//! server, and decodes replies.
//!
//! **Envelope Format** (before base64):
//! ```text
//! [nonce (16 bytes) | tag (16 bytes) | ciphertext (variable length)]
//! ```
//!
//! - Plaintext: canonical JSON of the payload, zlib-compressed at level 9
//! - Nonce: 16 random bytes from the OS RNG, fresh per envelope
//! - Algorithm: AES-256-GCM with a 128-bit nonce, no AAD
//!
//! Decoding verifies the tag before inflating anything.

use aes_gcm::{
    aead::{consts::U16, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::{Read, Write};

use super::ecdh::SharedKey;
use super::error::CryptoError;

/// Nonce length expected by the server
pub const NONCE_LEN: usize = 16;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Smallest decodable envelope: nonce + tag
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// Upper bound on inflated plaintext
const MAX_PLAINTEXT_LEN: u64 = 16 * 1024 * 1024;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Text-generation request carried inside an envelope
///
/// Field order here is the canonical serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub seed: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Reply carried inside an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub result: String,
}

/// A base64-encoded envelope as it travels over the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecureEnvelope(String);

impl SecureEnvelope {
    /// Wrap base64 text received from the transport
    pub fn from_base64(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The base64 text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to raw `nonce | tag | ciphertext` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        STANDARD
            .decode(self.0.trim().as_bytes())
            .map_err(|e| CryptoError::MalformedEnvelope {
                reason: format!("base64 decode error: {}", e),
            })
    }

    /// Build from raw `nonce | tag | ciphertext` bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }
}

/// Payload types that can travel inside an envelope
///
/// Implementors reject values with no canonical JSON form.
pub trait EnvelopePayload: Serialize + DeserializeOwned {
    /// Check the value before serialization
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl EnvelopePayload for RequestPayload {
    fn validate(&self) -> Result<(), String> {
        // serde_json writes NaN and infinities as null
        if !self.temperature.is_finite() {
            return Err(format!("temperature must be finite, got {}", self.temperature));
        }
        Ok(())
    }
}

impl EnvelopePayload for ResponsePayload {}

/// Serialize, compress and encrypt a payload
///
/// # Errors
///
/// `CryptoError::Encode` tagged with the failing stage.
pub fn encode<T: EnvelopePayload>(
    payload: &T,
    key: &SharedKey,
) -> Result<SecureEnvelope, CryptoError> {
    payload.validate().map_err(|reason| CryptoError::Encode {
        stage: "serialize",
        reason,
    })?;
    let json = serde_json::to_vec(payload).map_err(|e| CryptoError::Encode {
        stage: "serialize",
        reason: e.to_string(),
    })?;

    let mut buffer = compress(&json)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::<U16>::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm16::new_from_slice(key.as_bytes()).map_err(|e| {
        CryptoError::Encode {
            stage: "encrypt",
            reason: format!("failed to create AES-GCM cipher: {}", e),
        }
    })?;
    let tag = cipher
        .encrypt_in_place_detached(nonce, b"", &mut buffer)
        .map_err(|e| CryptoError::Encode {
            stage: "encrypt",
            reason: e.to_string(),
        })?;

    let mut framed = Vec::with_capacity(MIN_ENVELOPE_LEN + buffer.len());
    framed.extend_from_slice(&nonce_bytes);
    framed.extend_from_slice(&tag);
    framed.extend_from_slice(&buffer);

    tracing::debug!(
        "Encoded envelope: {} plaintext bytes -> {} wire bytes",
        json.len(),
        framed.len()
    );
    Ok(SecureEnvelope::from_bytes(&framed))
}

/// Decrypt, decompress and deserialize an envelope
///
/// The tag is verified before decompression; a failed tag never reaches the
/// inflater.
pub fn decode<T: EnvelopePayload>(
    envelope: &SecureEnvelope,
    key: &SharedKey,
) -> Result<T, CryptoError> {
    let framed = envelope.to_bytes()?;
    if framed.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::MalformedEnvelope {
            reason: format!(
                "expected at least {} bytes for nonce and tag, got {}",
                MIN_ENVELOPE_LEN,
                framed.len()
            ),
        });
    }

    let (nonce_bytes, rest) = framed.split_at(NONCE_LEN);
    let (tag_bytes, ciphertext) = rest.split_at(TAG_LEN);
    let nonce = Nonce::<U16>::from_slice(nonce_bytes);
    let tag = Tag::from_slice(tag_bytes);

    let cipher = Aes256Gcm16::new_from_slice(key.as_bytes()).map_err(|e| {
        CryptoError::MalformedEnvelope {
            reason: format!("failed to create AES-GCM cipher: {}", e),
        }
    })?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(nonce, b"", &mut buffer, tag)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let json = decompress(&buffer)?;
    serde_json::from_slice(&json).map_err(|e| CryptoError::InvalidPayload {
        reason: e.to_string(),
    })
}

fn compress(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| CryptoError::Encode {
            stage: "compress",
            reason: e.to_string(),
        })
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut inflated = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_PLAINTEXT_LEN + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| CryptoError::Decompression {
            reason: e.to_string(),
        })?;

    if inflated.len() as u64 > MAX_PLAINTEXT_LEN {
        return Err(CryptoError::Decompression {
            reason: format!("plaintext exceeds {} bytes", MAX_PLAINTEXT_LEN),
        });
    }
    Ok(inflated)
}
