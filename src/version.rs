// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the secure prompt client

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-p256-aes-gcm-2026-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-16";

/// Protocol features implemented by this client
pub const FEATURES: &[&str] = &[
    "ecdh-p256-ephemeral",
    "sha256-x-coordinate-kdf",
    "aes-256-gcm-16-byte-nonce",
    "zlib-level-9",
    "session-reuse-1h",
    "key-rotation-detection",
    "invalidate-on-failure",
    "plaintext-fallback",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Secure Prompt Client {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Default `User-Agent` header value
pub fn user_agent() -> String {
    format!("secure-prompt-client/{}", VERSION_NUMBER)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
