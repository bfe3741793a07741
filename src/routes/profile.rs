// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goals, settings, food values, profile and account reset.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, AuthVia};
use crate::models::{lenient, Goal, SynValue, UserSettings};
use crate::routes::logs::Saved;
use crate::services::normalize::{
    optional_date, weight_to_kg, CalendarDate, NormalizeError, WeightUnit,
};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Word the caller must send to confirm a reset.
const RESET_CONFIRMATION: &str = "RESET";

/// Profile routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user_goals", post(create_goal))
        .route("/api/update_user_settings", patch(update_user_settings))
        .route("/api/update_food_value", post(update_food_value))
        .route("/api/user_profile", get(user_profile))
        .route("/api/reset", post(reset))
}

fn now_rfc3339() -> String {
    format_utc_rfc3339(chrono::Utc::now())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ─── Goals ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub goal_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub target_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub stones: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub pounds: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub target_date: Option<String>,
}

impl CreateGoalRequest {
    fn into_goal(self, user_id: &str) -> std::result::Result<Goal, NormalizeError> {
        let goal_type = self
            .goal_type
            .and_then(non_blank)
            .ok_or(NormalizeError::MissingField("goal_type"))?;
        // Unlike weight logs, a goal must say which unit it is in
        let unit: WeightUnit = self
            .unit
            .and_then(non_blank)
            .ok_or(NormalizeError::MissingField("unit"))?
            .parse()?;
        let target_kg = weight_to_kg(self.target_value, unit, self.stones, self.pounds)
            .map_err(|e| e.for_field("target_value"))?;
        let target_date = optional_date("target_date", self.target_date.as_deref())?;

        Ok(Goal {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            goal_type,
            target_kg,
            target_date,
            created_at: now_rfc3339(),
        })
    }
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Saved<Goal>>)> {
    body.validate()?;
    let goal = body.into_goal(&user.user_id)?;

    state.db.insert_goal(&goal).await?;
    tracing::info!(user_id = %user.user_id, goal_type = %goal.goal_type, "Goal saved");

    Ok((StatusCode::CREATED, Json(Saved::new("Goal saved", goal))))
}

// ─── Settings ────────────────────────────────────────────────

/// Partial settings update. Absent fields are untouched; `null` clears.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(max = 100))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub preferred_name: Option<Option<String>>,
    #[validate(length(max = 100))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub tone: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub preferred_weight_unit: Option<Option<String>>,
    #[validate(length(max = 200))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub diet_preference: Option<Option<String>>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub food_allergies: Option<Option<String>>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub food_dislikes: Option<Option<String>>,
    #[validate(length(max = 2000))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub typical_day: Option<Option<String>>,
    #[validate(length(max = 200))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub healthy_extra_a: Option<Option<String>>,
    #[validate(length(max = 200))]
    #[serde(default, deserialize_with = "lenient::patch_string")]
    pub healthy_extra_b: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::patch_f64")]
    pub syn_limit: Option<Option<f64>>,
    /// Kilograms
    #[serde(default, deserialize_with = "lenient::patch_f64")]
    pub target_weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::patch_bool")]
    pub maintenance_mode_enabled: Option<Option<bool>>,
}

impl UpdateSettingsRequest {
    /// Settings document plus the names of the fields this request sets.
    fn into_patch(
        self,
        user_id: &str,
    ) -> std::result::Result<(UserSettings, Vec<&'static str>), NormalizeError> {
        let req = self;
        let mut settings = UserSettings {
            user_id: user_id.to_string(),
            updated_at: now_rfc3339(),
            ..Default::default()
        };
        let mut fields = Vec::new();

        macro_rules! set_text {
            ($($name:ident),*) => {$(
                if let Some(value) = req.$name {
                    settings.$name = value.and_then(non_blank);
                    fields.push(stringify!($name));
                }
            )*};
        }
        set_text!(
            preferred_name,
            tone,
            diet_preference,
            food_allergies,
            food_dislikes,
            typical_day,
            healthy_extra_a,
            healthy_extra_b
        );

        if let Some(unit) = req.preferred_weight_unit {
            settings.preferred_weight_unit = match unit.and_then(non_blank) {
                Some(raw) => Some(raw.parse::<WeightUnit>()?.as_str().to_string()),
                None => None,
            };
            fields.push("preferred_weight_unit");
        }
        if let Some(limit) = req.syn_limit {
            settings.syn_limit = limit;
            fields.push("syn_limit");
        }
        if let Some(target) = req.target_weight {
            settings.target_weight = match target {
                Some(kg) => Some(
                    weight_to_kg(Some(kg), WeightUnit::Kg, None, None)
                        .map_err(|e| e.for_field("target_weight"))?,
                ),
                None => None,
            };
            fields.push("target_weight");
        }
        if let Some(enabled) = req.maintenance_mode_enabled {
            settings.maintenance_mode_enabled = enabled;
            fields.push("maintenance_mode_enabled");
        }

        Ok((settings, fields))
    }
}

async fn update_user_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Saved<UserSettings>>> {
    body.validate()?;
    let (settings, fields) = body.into_patch(&user.user_id)?;
    if fields.is_empty() {
        return Err(AppError::BadRequest("No valid fields provided".to_string()));
    }

    state.db.patch_user_settings(&settings, &fields).await?;
    tracing::info!(user_id = %user.user_id, fields = ?fields, "User settings saved");

    // Return the merged document so the caller sees untouched fields too
    let merged = state
        .db
        .get_user_settings(&user.user_id)
        .await?
        .unwrap_or(settings);

    Ok(Json(Saved::new("User settings saved", merged)))
}

// ─── Food Values ─────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFoodValueRequest {
    #[validate(length(max = 200))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub syns: Option<f64>,
    /// Defaults to today (UTC)
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: Option<String>,
}

impl UpdateFoodValueRequest {
    fn into_value(self, user_id: &str) -> std::result::Result<SynValue, NormalizeError> {
        let food_name = self
            .food_name
            .and_then(non_blank)
            .ok_or(NormalizeError::MissingField("food_name"))?;
        let syn_value = self.syns.ok_or(NormalizeError::MissingField("syns"))?;
        let date = optional_date("date", self.date.as_deref())?.unwrap_or_else(CalendarDate::today);

        Ok(SynValue {
            id: SynValue::document_id(user_id, &food_name, &date),
            user_id: user_id.to_string(),
            food_name,
            syn_value,
            date,
            notes: self.notes.and_then(non_blank),
            updated_at: now_rfc3339(),
        })
    }
}

async fn update_food_value(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateFoodValueRequest>,
) -> Result<Json<Saved<SynValue>>> {
    body.validate()?;
    let value = body.into_value(&user.user_id)?;

    state.db.upsert_syn_value(&value).await?;
    tracing::info!(user_id = %user.user_id, food = %value.food_name, "Syn value saved");

    Ok(Json(Saved::new("Syn value saved", value)))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub auth_via: AuthVia,
}

async fn user_profile(Extension(user): Extension<AuthUser>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user_id: user.user_id,
        email: user.email,
        auth_via: user.via,
    })
}

// ─── Reset ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub message: String,
    pub deleted_count: usize,
}

/// Delete everything the caller owns, connect keys included.
async fn reset(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<ResetResponse>> {
    if body.confirm.as_deref() != Some(RESET_CONFIRMATION) {
        return Err(AppError::BadRequest(format!(
            "Confirmation required. Send {{\"confirm\": \"{RESET_CONFIRMATION}\"}} to proceed."
        )));
    }

    let deleted_count = state.db.delete_user_data(&user.user_id).await?;
    tracing::info!(user_id = %user.user_id, deleted_count, "User data reset");

    Ok(Json(ResetResponse {
        ok: true,
        message: "Your data has been cleared".to_string(),
        deleted_count,
    }))
}
