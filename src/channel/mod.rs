// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request channels to the prompt expansion server
//!
//! - **secure**: ECDH session + sealed envelopes (the default path)
//! - **plain**: cleartext JSON for servers without encryption
//! - **transport**: the HTTP boundary both of them post through

pub mod plain;
pub mod secure;
pub mod transport;

pub use plain::PlainClient;
pub use secure::{ChannelError, SecureChannel, API_KEY_HEADER};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
