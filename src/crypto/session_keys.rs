// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Key Cache
//!
//! Holds the one live session of the client: the derived key, the client's
//! ephemeral public key, the fingerprint of the server key it was derived
//! against, and when it was established.
//!
//! **Security**: Keys are stored in memory only and never persisted to disk.
//! A session is replaced wholesale, never patched field by field.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::ecdh::{handshake, RemotePublicKey, SharedKey};
use super::error::CryptoError;

/// Default session lifetime (one hour)
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(3600);

/// An established session
///
/// Callers receive an `Arc<Session>` snapshot; a concurrent refresh replaces
/// the cached snapshot but never mutates one already handed out.
#[derive(Debug)]
pub struct Session {
    pub shared_key: SharedKey,
    pub client_public_b64: String,
    pub remote_key_fingerprint: String,
    pub established_at: DateTime<Utc>,
}

/// Counters describing cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub handshakes: u64,
    pub reuses: u64,
    pub rotations: u64,
    pub expiries: u64,
    pub invalidations: u64,
}

#[derive(Default)]
struct SessionCell {
    current: Option<Arc<Session>>,
    stats: SessionStats,
}

/// Shared, lock-guarded session cache
///
/// Lookup, rotation check and handshake-and-store run under one lock, so two
/// callers racing on a cold cache perform a single handshake.
///
/// # Example
///
/// ```ignore
/// let state = SessionState::new();
/// let remote = RemotePublicKey::parse(&server_pub_b64)?;
/// let session = state.get_or_refresh(&remote).await?;
/// // ... on failure:
/// state.invalidate().await;
/// ```
#[derive(Clone)]
pub struct SessionState {
    cell: Arc<Mutex<SessionCell>>,
    lifetime: Duration,
}

impl SessionState {
    /// Create an empty cache with the default one-hour lifetime
    pub fn new() -> Self {
        Self::with_lifetime(DEFAULT_SESSION_LIFETIME)
    }

    /// Create an empty cache with a custom lifetime
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            cell: Arc::new(Mutex::new(SessionCell::default())),
            lifetime,
        }
    }

    /// Configured session lifetime
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Return the cached session or establish a new one
    pub async fn get_or_refresh(
        &self,
        remote: &RemotePublicKey,
    ) -> Result<Arc<Session>, CryptoError> {
        self.get_or_refresh_at(remote, Utc::now()).await
    }

    /// `get_or_refresh` against an explicit clock reading
    ///
    /// A cached session is reused only if it was derived against `remote`
    /// and is no older than the lifetime at `now`.
    pub async fn get_or_refresh_at(
        &self,
        remote: &RemotePublicKey,
        now: DateTime<Utc>,
    ) -> Result<Arc<Session>, CryptoError> {
        let mut cell = self.cell.lock().await;

        if let Some(session) = cell.current.clone() {
            if session.remote_key_fingerprint != remote.fingerprint() {
                // Nothing derived from the old server key may survive
                cell.current = None;
                cell.stats.rotations += 1;
                tracing::warn!(
                    "🔄 Server key rotation detected ({} -> {}), discarding session",
                    short(&session.remote_key_fingerprint),
                    short(remote.fingerprint())
                );
            } else if self.is_expired(&session, now) {
                cell.current = None;
                cell.stats.expiries += 1;
                tracing::info!(
                    "⏰ Session established at {} expired, re-handshaking",
                    session.established_at
                );
            } else {
                cell.stats.reuses += 1;
                tracing::debug!(
                    "Reusing session for server {}",
                    short(&session.remote_key_fingerprint)
                );
                return Ok(session);
            }
        }

        let (shared_key, client_public) = handshake(remote)?;
        let session = Arc::new(Session {
            shared_key,
            client_public_b64: STANDARD.encode(client_public),
            remote_key_fingerprint: remote.fingerprint().to_string(),
            established_at: now,
        });
        cell.current = Some(Arc::clone(&session));
        cell.stats.handshakes += 1;

        tracing::info!(
            "🔑 Handshake complete for server {} (client key {}…, handshakes: {})",
            short(remote.fingerprint()),
            short(&session.client_public_b64),
            cell.stats.handshakes
        );
        Ok(session)
    }

    /// Drop the cached session unconditionally
    pub async fn invalidate(&self) {
        let mut cell = self.cell.lock().await;
        if cell.current.take().is_some() {
            cell.stats.invalidations += 1;
            tracing::info!("🗑️  Session invalidated");
        }
    }

    /// The cached session, if any, without refreshing
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.cell.lock().await.current.clone()
    }

    /// Snapshot of the cache counters
    pub async fn stats(&self) -> SessionStats {
        self.cell.lock().await.stats
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards counts as zero elapsed time
        let elapsed = (now - session.established_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        elapsed > self.lifetime
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn short(text: &str) -> &str {
    text.get(..12).unwrap_or(text)
}
