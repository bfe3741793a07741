// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Daily logs (weight, meals, exercise, body measurements)
//! - Goals, settings and per-food syn values
//! - Connect keys (via [`KeyStore`])

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    ConnectKey, ExerciseLog, Goal, MealLog, MeasurementLog, SynValue, UserSettings, WeightLog,
};
use crate::services::connect_key::KeyStore;
use crate::services::normalize::CalendarDate;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Collections holding per-user records with a `user_id` field.
const USER_OWNED_COLLECTIONS: [&str; 6] = [
    collections::WEIGHT_LOGS,
    collections::MEAL_LOGS,
    collections::EXERCISE_LOGS,
    collections::BODY_MEASUREMENTS,
    collections::USER_GOALS,
    collections::SYN_VALUES,
];

/// Just enough of a document to delete it.
#[derive(Debug, Deserialize)]
struct DocRef {
    id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Cheap round trip to check the store is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        let _: Option<UserSettings> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_SETTINGS)
            .obj()
            .one("__ping__")
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Write a whole document, replacing any existing one.
    async fn put_document<T>(&self, collection: &str, doc_id: &str, object: &T) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send,
        for<'de> T: Deserialize<'de>,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write only `fields` of `object`. Creates the document if missing.
    async fn patch_document<T>(
        &self,
        collection: &str,
        doc_id: &str,
        fields: &[&str],
        object: &T,
    ) -> Result<(), AppError>
    where
        T: Serialize + Sync + Send,
        for<'de> T: Deserialize<'de>,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields.iter().copied())
            .in_col(collection)
            .document_id(doc_id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Delete every document in `collection` whose `owner_field` is `user_id`.
    async fn delete_owned(
        &self,
        collection: &str,
        owner_field: &'static str,
        user_id: &str,
    ) -> Result<usize, AppError> {
        let owner = user_id.to_string();
        let docs: Vec<DocRef> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| q.for_all([q.field(owner_field).eq(owner.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.batch_delete(&docs, collection, |doc: &DocRef| doc.id.clone())
            .await?;
        Ok(docs.len())
    }

    // ─── Log Operations ──────────────────────────────────────────

    pub async fn insert_weight_log(&self, log: &WeightLog) -> Result<(), AppError> {
        self.put_document(collections::WEIGHT_LOGS, &log.id, log).await
    }

    pub async fn insert_meal_log(&self, log: &MealLog) -> Result<(), AppError> {
        self.put_document(collections::MEAL_LOGS, &log.id, log).await
    }

    pub async fn insert_exercise_log(&self, log: &ExerciseLog) -> Result<(), AppError> {
        self.put_document(collections::EXERCISE_LOGS, &log.id, log).await
    }

    pub async fn insert_measurement_log(&self, log: &MeasurementLog) -> Result<(), AppError> {
        self.put_document(collections::BODY_MEASUREMENTS, &log.id, log)
            .await
    }

    /// Weight entries for a user, oldest first, with optional inclusive
    /// date bounds.
    pub async fn list_weight_logs(
        &self,
        user_id: &str,
        start: Option<&CalendarDate>,
        end: Option<&CalendarDate>,
    ) -> Result<Vec<WeightLog>, AppError> {
        let user_id = user_id.to_string();
        let start = start.map(|d| d.as_str().to_string());
        let end = end.map(|d| d.as_str().to_string());

        self.get_client()?
            .fluent()
            .select()
            .from(collections::WEIGHT_LOGS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    start
                        .clone()
                        .and_then(|s| q.field("date").greater_than_or_equal(s)),
                    end.clone().and_then(|e| q.field("date").less_than_or_equal(e)),
                ])
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Profile Operations ──────────────────────────────────────

    pub async fn insert_goal(&self, goal: &Goal) -> Result<(), AppError> {
        self.put_document(collections::USER_GOALS, &goal.id, goal).await
    }

    /// Create or overwrite the syn value for (user, food, date).
    pub async fn upsert_syn_value(&self, value: &SynValue) -> Result<(), AppError> {
        self.put_document(collections::SYN_VALUES, &value.id, value).await
    }

    pub async fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_SETTINGS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write only the named settings fields (plus `user_id` and
    /// `updated_at`). Other stored fields are left alone.
    pub async fn patch_user_settings(
        &self,
        settings: &UserSettings,
        fields: &[&str],
    ) -> Result<(), AppError> {
        let mut mask: Vec<&str> = Vec::with_capacity(fields.len() + 2);
        mask.extend_from_slice(fields);
        mask.push("user_id");
        mask.push("updated_at");

        self.patch_document(collections::USER_SETTINGS, &settings.user_id, &mask, settings)
            .await
    }

    // ─── User Data Deletion ─────────────────────────────────────────

    /// Delete ALL data for a user.
    ///
    /// Covers every log collection, goals, syn values, the settings
    /// document and the user's connect keys.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        for collection in USER_OWNED_COLLECTIONS {
            let count = self.delete_owned(collection, "user_id", user_id).await?;
            deleted_count += count;
            tracing::debug!(user_id, collection, count, "Deleted user records");
        }

        let count = self
            .delete_owned(collections::CONNECT_KEYS, "owner_user_id", user_id)
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted connect keys");

        if self.get_user_settings(user_id).await?.is_some() {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::USER_SETTINGS)
                .document_id(user_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            deleted_count += 1;
            tracing::debug!(user_id, "Deleted user settings");
        }

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }

    // ─── Connect Key Operations ─────────────────────────────────────

    async fn connect_keys_where(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<Vec<ConnectKey>, AppError> {
        let value = value.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CONNECT_KEYS)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl KeyStore for FirestoreDb {
    async fn revoke_active_keys(&self, owner_user_id: &str) -> Result<usize, AppError> {
        // Only the owner is filtered server side; liveness is checked here.
        let live: Vec<ConnectKey> = self
            .connect_keys_where("owner_user_id", owner_user_id)
            .await?
            .into_iter()
            .filter(ConnectKey::is_live)
            .map(|mut key| {
                key.active = false;
                key.revoked = true;
                key
            })
            .collect();

        let count = live.len();
        stream::iter(live)
            .map(|key| async move {
                self.patch_document(collections::CONNECT_KEYS, &key.id, &["active", "revoked"], &key)
                    .await
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(count)
    }

    async fn insert_key(&self, record: &ConnectKey) -> Result<String, AppError> {
        self.put_document(collections::CONNECT_KEYS, &record.id, record)
            .await?;
        Ok(record.id.clone())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ConnectKey>, AppError> {
        Ok(self
            .connect_keys_where("key_hash", key_hash)
            .await?
            .into_iter()
            .next())
    }

    async fn touch_last_used(&self, key_hash: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(mut key) = self.find_by_hash(key_hash).await? {
            key.last_used_at = Some(at);
            self.patch_document(collections::CONNECT_KEYS, &key.id, &["last_used_at"], &key)
                .await?;
        }
        Ok(())
    }
}
