// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! SecureChannel state machine tests against the in-process test server

use secure_prompt_client::channel::{ChannelError, SecureChannel, TransportError};
use secure_prompt_client::crypto::{CryptoError, SessionState};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{acknowledgment, cat_request, Behavior, TestServer};

const URL: &str = "https://tunnel.example";
const API_KEY: &str = "0123456789abcdef0123456789abcdef";
const TIMEOUT: Duration = Duration::from_secs(30);

fn setup() -> (Arc<TestServer>, SecureChannel<TestServer>) {
    let server = Arc::new(TestServer::new());
    let channel = SecureChannel::new(Arc::clone(&server), SessionState::new());
    (server, channel)
}

#[tokio::test]
async fn test_session_reused_across_sends() {
    let (server, channel) = setup();
    let key = server.public_key_b64();

    for _ in 0..3 {
        channel
            .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
            .await
            .unwrap();
    }

    let received = server.received();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|r| r.client_pub == received[0].client_pub));
    assert_eq!(channel.session().stats().await.handshakes, 1);
}

#[tokio::test]
async fn test_transport_failure_forces_fresh_handshake() {
    let (server, channel) = setup();
    let key = server.public_key_b64();
    server.script([Behavior::ConnectionError]);

    let err = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Transport(TransportError::Connection(_))
    ));
    assert!(err.is_retryable());
    assert!(channel.session().current().await.is_none());

    // Same key, no time elapsed: still a new handshake
    channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap();

    let received = server.received();
    assert_ne!(received[0].client_pub, received[1].client_pub);
    assert_eq!(channel.session().stats().await.handshakes, 2);
}

#[tokio::test]
async fn test_timeout_invalidates_like_connection_failure() {
    let (server, channel) = setup();
    let key = server.public_key_b64();
    server.script([Behavior::Timeout]);

    let err = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ChannelError::Transport(TransportError::Timeout { timeout_secs: 30 })
    );
    assert_eq!(channel.session().stats().await.invalidations, 1);
}

#[tokio::test]
async fn test_non_2xx_status_invalidates() {
    let (server, channel) = setup();
    let key = server.public_key_b64();
    server.script([Behavior::Status(503)]);

    let err = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Transport(TransportError::Status { status: 503, .. })
    ));
    assert!(channel.session().current().await.is_none());
}

#[tokio::test]
async fn test_wrong_key_reply_is_authentication_failure() {
    let (server, channel) = setup();
    let key = server.public_key_b64();
    server.script([Behavior::WrongKeyReply]);

    let err = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err, ChannelError::Decode(CryptoError::AuthenticationFailed));
    assert!(err.invalidates_session());
    assert!(channel.session().current().await.is_none());
}

#[tokio::test]
async fn test_tampered_reply_is_authentication_failure() {
    let (server, channel) = setup();
    let key = server.public_key_b64();
    server.script([Behavior::TamperedReply]);

    let err = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert_eq!(err, ChannelError::Decode(CryptoError::AuthenticationFailed));

    // Recovery on the next call
    let reply = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply.result, acknowledgment("a cat"));
}

#[tokio::test]
async fn test_uncompressed_reply_is_decompression_failure() {
    let (server, channel) = setup();
    let key = server.public_key_b64();
    server.script([Behavior::UncompressedReply]);

    let err = channel
        .send(URL, &key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Decode(CryptoError::Decompression { .. })
    ));
    assert!(err.invalidates_session());
    assert!(channel.session().current().await.is_none());
    assert_eq!(channel.session().stats().await.invalidations, 1);
}

#[tokio::test]
async fn test_server_restart_detected_through_new_key() {
    let (server, channel) = setup();
    let old_key = server.public_key_b64();
    channel
        .send(URL, &old_key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap();

    server.rotate_key();

    // Caller still passes the old key: server cannot decrypt, rejects with 400
    let err = channel
        .send(URL, &old_key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Transport(TransportError::Status { status: 400, .. })
    ));

    // With the new key the rotation is detected and a fresh session works
    let new_key = server.public_key_b64();
    let reply = channel
        .send(URL, &new_key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply.result, acknowledgment("a cat"));
}

#[tokio::test]
async fn test_rotation_between_sends_uses_new_session() {
    let (server, channel) = setup();
    let first_key = server.public_key_b64();
    channel
        .send(URL, &first_key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap();

    server.rotate_key();
    let second_key = server.public_key_b64();
    channel
        .send(URL, &second_key, API_KEY, &cat_request(), TIMEOUT)
        .await
        .unwrap();

    let stats = channel.session().stats().await;
    assert_eq!(stats.rotations, 1);
    assert_eq!(stats.handshakes, 2);
}

#[tokio::test]
async fn test_concurrent_sends_share_one_handshake() {
    let server = Arc::new(TestServer::new());
    let channel = Arc::new(SecureChannel::new(Arc::clone(&server), SessionState::new()));
    let key = server.public_key_b64();

    let mut handles = Vec::new();
    for i in 0..8 {
        let channel = Arc::clone(&channel);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let mut payload = cat_request();
            payload.prompt = format!("cat #{}", i);
            channel.send(URL, &key, API_KEY, &payload, TIMEOUT).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let reply = handle.await.unwrap().unwrap();
        assert_eq!(reply.result, acknowledgment(&format!("cat #{}", i)));
    }
    assert_eq!(channel.session().stats().await.handshakes, 1);
}
