// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Host client tests: raw inputs in, display string out

use secure_prompt_client::config::ClientConfig;
use secure_prompt_client::host::{ExpansionRequest, HostClient};
use std::sync::Arc;

use crate::common::{acknowledgment, Behavior, TestServer};

fn request(server: &TestServer) -> ExpansionRequest {
    ExpansionRequest {
        server_url: " https://abc.trycloudflare.com/ ".to_string(),
        api_key: " secret-api-key ".to_string(),
        server_public_key: format!("{}\n", server.public_key_b64()),
        system_prompt: None,
        prompt: "a cat".to_string(),
        seed: 0,
        max_tokens: 512,
        temperature: 0.7,
        timeout_secs: 60,
    }
}

fn client(server: &Arc<TestServer>) -> HostClient<TestServer> {
    HostClient::new(Arc::clone(server), &ClientConfig::default())
}

#[tokio::test]
async fn test_expand_returns_reply_text() {
    let server = Arc::new(TestServer::new());
    let host = client(&server);

    let text = host.expand(&request(&server)).await;

    assert_eq!(text, acknowledgment("a cat"));
    let received = server.received();
    assert_eq!(received[0].api_key.as_deref(), Some("secret-api-key"));
    assert_eq!(received[0].url, "https://abc.trycloudflare.com/engineer");
}

#[tokio::test]
async fn test_rejected_api_key_rendered() {
    let server = Arc::new(TestServer::new());
    server.script([Behavior::Status(403)]);
    let host = client(&server);

    let text = host.expand(&request(&server)).await;

    assert!(text.starts_with("⛔"), "got {}", text);
    assert!(host.session().current().await.is_none());
}

#[tokio::test]
async fn test_missing_credentials_make_no_request() {
    let server = Arc::new(TestServer::new());
    let host = client(&server);
    let mut req = request(&server);
    req.api_key = "  ".to_string();

    let text = host.expand(&req).await;

    assert_eq!(text, "❌ Server URL and API key are required.");
    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_invalid_public_key_rendered() {
    let server = Arc::new(TestServer::new());
    let host = client(&server);
    let mut req = request(&server);
    req.server_public_key = "not-a-key".to_string();

    let text = host.expand(&req).await;

    assert!(text.starts_with("🔑"), "got {}", text);
    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_out_of_range_tokens_rejected_locally() {
    let server = Arc::new(TestServer::new());
    let host = client(&server);
    let mut req = request(&server);
    req.max_tokens = 10_000;

    let text = host.expand(&req).await;

    assert!(text.starts_with("❌"));
    assert!(text.contains("10000"));
    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_decode_failure_rendered_and_recovers() {
    let server = Arc::new(TestServer::new());
    server.script([Behavior::TamperedReply]);
    let host = client(&server);

    let first = host.expand(&request(&server)).await;
    assert!(first.starts_with("🔐"), "got {}", first);

    let second = host.expand(&request(&server)).await;
    assert_eq!(second, acknowledgment("a cat"));
    assert_eq!(host.session().stats().await.handshakes, 2);
}
