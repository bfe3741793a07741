// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connect keys: short-lived, human-shareable bearer credentials.
//!
//! A signed-in user asks for a key (`SB-XXXX-XXX-X-XXXX`), pastes it into a
//! conversational agent, and the agent presents it on every call instead of
//! a session token. Lifecycle:
//!
//! 1. `issue` revokes the owner's previous keys, stores only the SHA-256 of
//!    the new key and hands the plaintext back exactly once.
//! 2. `verify` checks the shape, looks the key up by hash and enforces
//!    `active && !revoked && now < expires_at`.
//!
//! Issuance is serialized per owner inside this process. Two API instances
//! issuing for the same owner at the same moment can still both leave an
//! active key behind, so "one active key per owner" is a soft invariant.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::ConnectKey;
use crate::time_utils::{Clock, SystemClock};

/// Header an agent sends the key in.
pub const CONNECT_KEY_HEADER: &str = "x-connect-key";
/// `Authorization` scheme accepted as an alternative to the header.
pub const CONNECT_AUTH_SCHEME: &str = "Connect";

const KEY_PREFIX: &str = "SB";
/// Symbol counts of the dash-separated groups after the prefix.
const KEY_GROUPS: [usize; 4] = [4, 3, 1, 4];
const KEY_SYMBOLS: usize = 12;
/// No 0/O or 1/I. 32 symbols, so a byte masked with 0x1f picks one without bias.
const KEY_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// ─── Errors ──────────────────────────────────────────────────

/// Why a well-formed key was refused. Internal diagnostics only: callers
/// outside this crate see a single generic "unauthorized".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    NotFound,
    Revoked,
    Expired,
}

impl UnauthenticatedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnauthenticatedReason::NotFound => "not_found",
            UnauthenticatedReason::Revoked => "revoked",
            UnauthenticatedReason::Expired => "expired",
        }
    }
}

impl fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectKeyError {
    #[error("Connect key is not in SB-XXXX-XXX-X-XXXX form")]
    InvalidFormat,

    #[error("Connect key rejected ({0})")]
    Unauthenticated(UnauthenticatedReason),

    #[error("Key store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Secure random source failed")]
    RandomSource,

    #[error("Connect key lifetime must be positive and representable")]
    InvalidTtl,
}

// ─── Collaborators ───────────────────────────────────────────

/// Persistence for connect key records.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Mark every active, unrevoked key of `owner_user_id` as revoked.
    /// Returns how many were revoked; 0 is not an error.
    async fn revoke_active_keys(&self, owner_user_id: &str) -> Result<usize, AppError>;

    /// Store a new record and return its ID.
    async fn insert_key(&self, record: &ConnectKey) -> Result<String, AppError>;

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ConnectKey>, AppError>;

    /// Record a successful verification. Best effort.
    async fn touch_last_used(&self, key_hash: &str, at: DateTime<Utc>) -> Result<(), AppError>;
}

/// Cryptographically secure byte source.
pub trait RandomSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), ConnectKeyError>;
}

impl RandomSource for ring::rand::SystemRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), ConnectKeyError> {
        ring::rand::SecureRandom::fill(self, dest).map_err(|_| ConnectKeyError::RandomSource)
    }
}

// ─── Key Format ──────────────────────────────────────────────

/// Generate a plaintext key such as `SB-4F9K-2MX-G-7QH2`.
pub fn generate_plain_key(rng: &dyn RandomSource) -> Result<String, ConnectKeyError> {
    let mut bytes = [0u8; KEY_SYMBOLS];
    rng.fill(&mut bytes)?;

    let mut symbols = bytes
        .iter()
        .map(|b| KEY_ALPHABET[(b & 0x1f) as usize] as char);

    let mut key = String::with_capacity(KEY_PREFIX.len() + KEY_SYMBOLS + KEY_GROUPS.len());
    key.push_str(KEY_PREFIX);
    for len in KEY_GROUPS {
        key.push('-');
        key.extend(symbols.by_ref().take(len));
    }
    Ok(key)
}

/// `SB-` followed by groups of 4, 3, 1 and 4 uppercase alphanumerics.
///
/// Accepts the full `A-Z0-9` range, not just the issuing alphabet, so keys
/// minted before the alphabet was narrowed still pass the shape check.
pub fn is_well_formed(key: &str) -> bool {
    let mut parts = key.split('-');
    if parts.next() != Some(KEY_PREFIX) {
        return false;
    }

    let groups: Vec<&str> = parts.collect();
    groups.len() == KEY_GROUPS.len()
        && groups.iter().zip(KEY_GROUPS).all(|(group, len)| {
            group.len() == len
                && group
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
}

/// Lowercase hex SHA-256 of a plaintext key.
pub fn hash_key(plain_key: &str) -> String {
    hex::encode(Sha256::digest(plain_key.as_bytes()))
}

/// Pull a connect key from `X-Connect-Key`, falling back to
/// `Authorization: Connect <key>`.
pub fn extract_connect_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers
        .get(CONNECT_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        return Some(key);
    }

    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, rest) = auth.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(CONNECT_AUTH_SCHEME) {
        return None;
    }
    Some(rest.trim()).filter(|k| !k.is_empty())
}

// ─── Service ─────────────────────────────────────────────────

/// A freshly issued key. The only place the plaintext ever exists.
#[derive(Clone)]
pub struct IssuedKey {
    pub plain_key: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedKey")
            .field("plain_key", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity behind a successfully verified key.
#[derive(Debug, Clone)]
pub struct VerifiedKey {
    pub owner_user_id: String,
    pub expires_at: DateTime<Utc>,
    pub label: Option<String>,
}

/// Issues and verifies connect keys against a [`KeyStore`].
pub struct ConnectKeyService {
    store: Arc<dyn KeyStore>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    /// Per-owner issuance locks (revoke + insert must not interleave)
    issue_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConnectKeyService {
    /// Service backed by the wall clock and the OS CSPRNG.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_sources(
            store,
            Arc::new(SystemClock),
            Arc::new(ring::rand::SystemRandom::new()),
        )
    }

    pub fn with_sources(
        store: Arc<dyn KeyStore>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            clock,
            rng,
            issue_locks: DashMap::new(),
        }
    }

    /// Issue a new key for `owner_user_id`, valid for `ttl`.
    ///
    /// Previous keys are revoked first. A failed revoke is logged and
    /// ignored; a failed insert fails the call with `StoreUnavailable`.
    pub async fn issue(
        &self,
        owner_user_id: &str,
        ttl: Duration,
    ) -> Result<IssuedKey, ConnectKeyError> {
        let lock = self
            .issue_locks
            .entry(owner_user_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock().await;
        let result = self.issue_locked(owner_user_id, ttl).await;
        drop(guard);

        // Map entry plus our clone; anything more is a waiting issuer
        self.issue_locks
            .remove_if(owner_user_id, |_, l| Arc::strong_count(l) <= 2);

        result
    }

    async fn issue_locked(
        &self,
        owner_user_id: &str,
        ttl: Duration,
    ) -> Result<IssuedKey, ConnectKeyError> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .filter(|at| *at > now)
            .ok_or(ConnectKeyError::InvalidTtl)?;

        let plain_key = generate_plain_key(self.rng.as_ref())?;

        match self.store.revoke_active_keys(owner_user_id).await {
            Ok(revoked) => {
                tracing::debug!(user_id = owner_user_id, revoked, "Revoked previous connect keys")
            }
            Err(e) => tracing::warn!(
                user_id = owner_user_id,
                error = %e,
                "Failed to revoke previous connect keys, issuing anyway"
            ),
        }

        let record = ConnectKey {
            id: uuid::Uuid::new_v4().to_string(),
            owner_user_id: owner_user_id.to_string(),
            key_hash: hash_key(&plain_key),
            created_at: now,
            expires_at,
            active: true,
            revoked: false,
            last_used_at: None,
            label: None,
        };

        let stored_id = self
            .store
            .insert_key(&record)
            .await
            .map_err(|e| ConnectKeyError::StoreUnavailable(e.to_string()))?;

        tracing::info!(
            user_id = owner_user_id,
            key_id = %stored_id,
            expires_at = %record.expires_at,
            "Connect key issued"
        );

        Ok(IssuedKey {
            plain_key,
            expires_at: record.expires_at,
        })
    }

    /// Resolve a presented key to its owner.
    ///
    /// Lowercase input is accepted; issued keys are always uppercase.
    pub async fn verify(&self, candidate: &str) -> Result<VerifiedKey, ConnectKeyError> {
        let candidate = candidate.trim().to_ascii_uppercase();
        if !is_well_formed(&candidate) {
            return Err(ConnectKeyError::InvalidFormat);
        }

        let key_hash = hash_key(&candidate);
        let record = self
            .store
            .find_by_hash(&key_hash)
            .await
            .map_err(|e| ConnectKeyError::StoreUnavailable(e.to_string()))?
            .ok_or(ConnectKeyError::Unauthenticated(
                UnauthenticatedReason::NotFound,
            ))?;

        if !record.is_live() {
            return Err(ConnectKeyError::Unauthenticated(
                UnauthenticatedReason::Revoked,
            ));
        }

        let now = self.clock.now();
        if record.is_expired_at(now) {
            return Err(ConnectKeyError::Unauthenticated(
                UnauthenticatedReason::Expired,
            ));
        }

        // Diagnostic timestamp only; don't hold up the caller.
        let store = Arc::clone(&self.store);
        let key_id = record.id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_used(&key_hash, now).await {
                tracing::warn!(key_id = %key_id, error = %e, "Failed to record connect key use");
            }
        });

        Ok(VerifiedKey {
            owner_user_id: record.owner_user_id,
            expires_at: record.expires_at,
            label: record.label,
        })
    }
}
