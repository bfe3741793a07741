// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily logging routes: weight, meals, exercise and body measurements.
//!
//! Every handler normalizes the whole body before touching the store, so a
//! bad field rejects the write instead of persisting a partial record.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{lenient, ExerciseLog, MealLog, MeasurementLog, WeightLog};
use crate::services::normalize::{
    length_to_cm, optional_date, require_date, unit_or_default, weight_to_kg, CalendarDate,
    LengthUnit, NormalizeError, WeightUnit,
};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Log routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/log_weight", post(log_weight))
        .route("/api/log_meal", post(log_meal))
        .route("/api/log_exercise", post(log_exercise))
        .route("/api/log_measurements", post(log_measurements))
        .route("/api/weight_graph", get(weight_graph))
}

/// Envelope for successful writes.
#[derive(Debug, Serialize)]
pub struct Saved<T> {
    pub ok: bool,
    pub message: &'static str,
    pub data: T,
}

impl<T> Saved<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        Self {
            ok: true,
            message,
            data,
        }
    }
}

fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now_rfc3339() -> String {
    format_utc_rfc3339(chrono::Utc::now())
}

/// Trimmed, non-empty text.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─── Weight ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LogWeightRequest {
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub stones: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub pounds: Option<f64>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: Option<String>,
}

impl LogWeightRequest {
    fn into_log(self, user_id: &str) -> std::result::Result<WeightLog, NormalizeError> {
        let date = require_date("date", self.date.as_deref())?;
        let unit: WeightUnit = unit_or_default(self.unit.as_deref())?;
        let weight_kg =
            weight_to_kg(self.weight, unit, self.stones, self.pounds).map_err(|e| e.for_field("weight"))?;

        Ok(WeightLog {
            id: new_record_id(),
            user_id: user_id.to_string(),
            date,
            weight_kg,
            raw_unit: unit,
            notes: non_blank(self.notes),
            created_at: now_rfc3339(),
        })
    }
}

async fn log_weight(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<LogWeightRequest>,
) -> Result<(StatusCode, Json<Saved<WeightLog>>)> {
    body.validate()?;
    let log = body.into_log(&user.user_id)?;

    state.db.insert_weight_log(&log).await?;
    tracing::info!(
        user_id = %user.user_id,
        date = %log.date,
        unit = log.raw_unit.as_str(),
        "Weight logged"
    );

    Ok((StatusCode::CREATED, Json(Saved::new("Weight logged", log))))
}

// ─── Meals ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LogMealRequest {
    /// Defaults to today (UTC)
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
    #[validate(length(max = 500))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub meal_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub syns: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub healthy_extra_a_used: Option<bool>,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub healthy_extra_b_used: Option<bool>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: Option<String>,
}

impl LogMealRequest {
    fn into_log(self, user_id: &str) -> std::result::Result<MealLog, NormalizeError> {
        let date = optional_date("date", self.date.as_deref())?.unwrap_or_else(CalendarDate::today);
        let meal_description =
            non_blank(self.meal_description).ok_or(NormalizeError::MissingField("meal_description"))?;
        let syns = self.syns.ok_or(NormalizeError::MissingField("syns"))?;

        Ok(MealLog {
            id: new_record_id(),
            user_id: user_id.to_string(),
            date,
            meal_description,
            syns,
            calories: self.calories,
            healthy_extra_a_used: self.healthy_extra_a_used.unwrap_or(false),
            healthy_extra_b_used: self.healthy_extra_b_used.unwrap_or(false),
            notes: non_blank(self.notes),
            created_at: now_rfc3339(),
        })
    }
}

async fn log_meal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<LogMealRequest>,
) -> Result<(StatusCode, Json<Saved<MealLog>>)> {
    body.validate()?;
    let log = body.into_log(&user.user_id)?;

    state.db.insert_meal_log(&log).await?;
    tracing::info!(user_id = %user.user_id, date = %log.date, syns = log.syns, "Meal logged");

    Ok((StatusCode::CREATED, Json(Saved::new("Meal logged", log))))
}

// ─── Exercise ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LogExerciseRequest {
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
    #[validate(length(max = 200))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub activity: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub duration_minutes: Option<f64>,
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub intensity: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub calories_burned: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub steps: Option<i64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub distance_km: Option<f64>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: Option<String>,
}

impl LogExerciseRequest {
    fn into_log(self, user_id: &str) -> std::result::Result<ExerciseLog, NormalizeError> {
        let date = require_date("date", self.date.as_deref())?;
        let activity = non_blank(self.activity).ok_or(NormalizeError::MissingField("activity"))?;

        Ok(ExerciseLog {
            id: new_record_id(),
            user_id: user_id.to_string(),
            date,
            activity,
            duration_minutes: self.duration_minutes,
            intensity: non_blank(self.intensity),
            calories_burned: self.calories_burned,
            steps: self.steps,
            distance_km: self.distance_km,
            notes: non_blank(self.notes),
            created_at: now_rfc3339(),
        })
    }
}

async fn log_exercise(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<LogExerciseRequest>,
) -> Result<(StatusCode, Json<Saved<ExerciseLog>>)> {
    body.validate()?;
    let log = body.into_log(&user.user_id)?;

    state.db.insert_exercise_log(&log).await?;
    tracing::info!(user_id = %user.user_id, date = %log.date, activity = %log.activity, "Exercise logged");

    Ok((StatusCode::CREATED, Json(Saved::new("Exercise logged", log))))
}

// ─── Body Measurements ───────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LogMeasurementsRequest {
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
    /// "cm" (default) or "in"
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub bust: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub waist: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub hips: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub neck: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub arm: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub under_bust: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub thighs: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub knees: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub ankles: Option<f64>,
    #[validate(length(max = 1000))]
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: Option<String>,
}

impl LogMeasurementsRequest {
    fn into_log(self, user_id: &str) -> std::result::Result<MeasurementLog, NormalizeError> {
        let date = require_date("date", self.date.as_deref())?;
        let unit: LengthUnit = unit_or_default(self.unit.as_deref())?;
        let cm = |value| length_to_cm(value, unit);

        Ok(MeasurementLog {
            id: new_record_id(),
            user_id: user_id.to_string(),
            date,
            bust: cm(self.bust),
            waist: cm(self.waist),
            hips: cm(self.hips),
            neck: cm(self.neck),
            arm: cm(self.arm),
            under_bust: cm(self.under_bust),
            thighs: cm(self.thighs),
            knees: cm(self.knees),
            ankles: cm(self.ankles),
            raw_unit: unit,
            notes: non_blank(self.notes),
            created_at: now_rfc3339(),
        })
    }
}

async fn log_measurements(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<LogMeasurementsRequest>,
) -> Result<(StatusCode, Json<Saved<MeasurementLog>>)> {
    body.validate()?;
    let log = body.into_log(&user.user_id)?;

    state.db.insert_measurement_log(&log).await?;
    tracing::info!(user_id = %user.user_id, date = %log.date, "Measurements logged");

    Ok((StatusCode::CREATED, Json(Saved::new("Measurements logged", log))))
}

// ─── Weight Graph ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WeightGraphQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// One point on the weight chart.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeightPoint {
    pub date: String,
    pub weight_kg: f64,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeightGraphResponse {
    pub user_id: String,
    pub data: Vec<WeightPoint>,
}

async fn weight_graph(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<WeightGraphQuery>,
) -> Result<Json<WeightGraphResponse>> {
    let start = optional_date("start", query.start.as_deref())?;
    let end = optional_date("end", query.end.as_deref())?;
    if let (Some(start), Some(end)) = (&start, &end) {
        if start > end {
            return Err(AppError::BadRequest(format!(
                "start ({start}) is after end ({end})"
            )));
        }
    }

    let logs = state
        .db
        .list_weight_logs(&user.user_id, start.as_ref(), end.as_ref())
        .await?;

    let data = logs
        .into_iter()
        .map(|log| WeightPoint {
            date: log.date.to_string(),
            weight_kg: log.weight_kg,
        })
        .collect();

    Ok(Json(WeightGraphResponse {
        user_id: user.user_id,
        data,
    }))
}
