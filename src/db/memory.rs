// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process connect key store.
//!
//! Used by tests and by local runs without a Firestore emulator. Records
//! are lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::ConnectKey;
use crate::services::connect_key::KeyStore;

/// Connect keys indexed by record ID.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<DashMap<String, ConnectKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record owned by `owner_user_id`, oldest first.
    pub fn records_for(&self, owner_user_id: &str) -> Vec<ConnectKey> {
        let mut records: Vec<ConnectKey> = self
            .keys
            .iter()
            .filter(|entry| entry.owner_user_id == owner_user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|k| k.created_at);
        records
    }

    /// Drop every record owned by `owner_user_id`. Returns how many went.
    pub fn remove_owner(&self, owner_user_id: &str) -> usize {
        let before = self.keys.len();
        self.keys.retain(|_, k| k.owner_user_id != owner_user_id);
        before - self.keys.len()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn revoke_active_keys(&self, owner_user_id: &str) -> Result<usize, AppError> {
        let mut revoked = 0;
        for mut entry in self.keys.iter_mut() {
            let key = entry.value_mut();
            if key.owner_user_id == owner_user_id && key.is_live() {
                key.active = false;
                key.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn insert_key(&self, record: &ConnectKey) -> Result<String, AppError> {
        self.keys.insert(record.id.clone(), record.clone());
        Ok(record.id.clone())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ConnectKey>, AppError> {
        Ok(self
            .keys
            .iter()
            .find(|entry| entry.key_hash == key_hash)
            .map(|entry| entry.value().clone()))
    }

    async fn touch_last_used(&self, key_hash: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        for mut entry in self.keys.iter_mut() {
            if entry.key_hash == key_hash {
                entry.value_mut().last_used_at = Some(at);
            }
        }
        Ok(())
    }
}
