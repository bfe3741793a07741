// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connect key record as persisted by a [`KeyStore`](crate::services::connect_key::KeyStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored connect key. Only the SHA-256 of the plaintext is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectKey {
    /// Record ID (also used as document ID)
    pub id: String,
    /// User the key authenticates as
    pub owner_user_id: String,
    /// Lowercase hex SHA-256 of the plaintext key
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub revoked: bool,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub label: Option<String>,
}

impl ConnectKey {
    /// Active and not revoked. Expiry is checked separately.
    pub fn is_live(&self) -> bool {
        self.active && !self.revoked
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
