// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod channel;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod host;
pub mod version;

// Re-export main types
pub use channel::{
    ChannelError, PlainClient, RawResponse, ReqwestTransport, SecureChannel, Transport,
    TransportError,
};
pub use config::ClientConfig;
pub use crypto::{
    CryptoError, RemotePublicKey, RequestPayload, ResponsePayload, SecureEnvelope, Session,
    SessionState, SharedKey,
};
pub use host::{ExpansionRequest, HostClient};
