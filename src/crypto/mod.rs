// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-End Encryption Module
//!
//! Client side of the encrypted channel to the prompt expansion server:
//!
//! - **ECDH**: Ephemeral-static key exchange on P-256
//! - **Codec**: canonical JSON, zlib, AES-256-GCM envelopes
//! - **Session Keys**: the single in-memory session and its lifecycle
//!
//! ## Security Considerations
//!
//! - Session keys are stored in memory only, never persisted
//! - Nonces are 16 random bytes per envelope and never reused deliberately
//! - Tags are verified before any decompression
//! - The key derivation is a bare SHA-256 of the ECDH x-coordinate, with no
//!   salt or transcript binding; it matches the server and is kept as-is
//!
//! ## Protocol Flow
//!
//! 1. Client parses the server's static public key
//! 2. Client generates an ephemeral keypair and derives the shared key
//! 3. Client seals the request and posts it with its ephemeral public key
//! 4. Server derives the same key, answers with a sealed reply
//! 5. Any transport or decode failure drops the session; the next request
//!    re-handshakes

pub mod aes_gcm;
pub mod ecdh;
pub mod error;
pub mod session_keys;

pub use aes_gcm::{
    decode, encode, EnvelopePayload, RequestPayload, ResponsePayload, SecureEnvelope,
};
pub use ecdh::{derive_shared_key, encode_public_key, handshake, RemotePublicKey, SharedKey};
pub use error::CryptoError;
pub use session_keys::{Session, SessionState, SessionStats};
