// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod expand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Secure prompt client CLI
#[derive(Parser, Debug)]
#[command(name = "engineer-cli")]
#[command(version)]
#[command(about = "Send prompt expansion requests over an encrypted channel", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expand a prompt over the encrypted channel
    Expand(expand::ExpandArgs),

    /// Expand a prompt in cleartext (servers without encryption)
    ExpandPlain(expand::ExpandArgs),

    /// Validate a server public key and print its fingerprint
    Fingerprint(expand::FingerprintArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Expand(args) => expand::expand(args, true).await,
        Commands::ExpandPlain(args) => expand::expand(args, false).await,
        Commands::Fingerprint(args) => expand::fingerprint(args),
    }
}

/// Build the log filter from `RUST_LOG`-style directives
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
