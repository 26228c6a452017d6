// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::config::ClientConfig;
use crate::crypto::RemotePublicKey;
use crate::host::{ExpansionRequest, HostClient};

/// Arguments for the expand commands
#[derive(Args, Debug)]
pub struct ExpandArgs {
    /// Server base URL (e.g. the tunnel address printed by the server)
    #[arg(long, env = "SPC_SERVER_URL")]
    pub server_url: String,

    /// API key printed in the server log
    #[arg(long, env = "SPC_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Server public key (base64 uncompressed P-256 point)
    #[arg(long, env = "SPC_SERVER_PUBLIC_KEY", default_value = "")]
    pub server_public_key: String,

    /// Prompt to expand
    #[arg(long, default_value = "a photo of cat")]
    pub prompt: String,

    /// Optional system prompt
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Generation seed
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Maximum tokens to generate (64-4096)
    #[arg(long, default_value_t = 512)]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-1.0)
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f64,

    /// Request timeout in seconds (10-300); defaults to the config value
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Optional TOML config file
    #[arg(long, env = "SPC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the fingerprint command
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Server public key (base64 uncompressed P-256 point)
    #[arg(long, env = "SPC_SERVER_PUBLIC_KEY")]
    pub server_public_key: String,
}

/// Run one expansion and print the rendered result
pub async fn expand(args: ExpandArgs, encrypted: bool) -> Result<()> {
    let config = ClientConfig::load(args.config.as_deref())?;
    let client = HostClient::from_config(&config)?;

    let request = ExpansionRequest {
        server_url: args.server_url,
        api_key: args.api_key,
        server_public_key: args.server_public_key,
        system_prompt: args.system_prompt,
        prompt: args.prompt,
        seed: args.seed,
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        timeout_secs: args.timeout.unwrap_or(config.default_timeout_secs),
    };

    info!(
        "Sending {} request",
        if encrypted { "encrypted" } else { "plaintext" }
    );
    let output = if encrypted {
        client.expand(&request).await
    } else {
        client.expand_plain(&request).await
    };
    println!("{}", output);
    Ok(())
}

/// Validate a server key and print its fingerprint
pub fn fingerprint(args: FingerprintArgs) -> Result<()> {
    let key = RemotePublicKey::parse(&args.server_public_key)?;
    println!("✅ Valid P-256 public key");
    println!("   Fingerprint (SHA-256): {}", key.fingerprint());
    Ok(())
}
