// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily log records: weight, meals, exercise, body measurements and
//! per-food syn values.
//!
//! All quantities are already canonical by the time one of these is built:
//! kilograms for mass, centimeters for length, `YYYY-MM-DD` for dates.

use serde::{Deserialize, Serialize};

use crate::services::normalize::{CalendarDate, LengthUnit, WeightUnit};

/// Weight log entry stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightLog {
    /// Record ID (also used as document ID)
    pub id: String,
    pub user_id: String,
    pub date: CalendarDate,
    /// Canonical weight, always persisted regardless of `raw_unit`
    pub weight_kg: f64,
    /// Unit the user typed the weight in
    pub raw_unit: WeightUnit,
    pub notes: Option<String>,
    /// When the entry was written (ISO 8601)
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealLog {
    pub id: String,
    pub user_id: String,
    pub date: CalendarDate,
    pub meal_description: String,
    pub syns: f64,
    pub calories: Option<f64>,
    pub healthy_extra_a_used: bool,
    pub healthy_extra_b_used: bool,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub id: String,
    pub user_id: String,
    pub date: CalendarDate,
    /// Free-text activity name ("walk", "swim", ...)
    pub activity: String,
    pub duration_minutes: Option<f64>,
    pub intensity: Option<String>,
    pub calories_burned: Option<f64>,
    pub steps: Option<i64>,
    pub distance_km: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Body measurements in centimeters. Absent fields are `None`, never 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementLog {
    pub id: String,
    pub user_id: String,
    pub date: CalendarDate,
    pub bust: Option<f64>,
    pub waist: Option<f64>,
    pub hips: Option<f64>,
    pub neck: Option<f64>,
    pub arm: Option<f64>,
    pub under_bust: Option<f64>,
    pub thighs: Option<f64>,
    pub knees: Option<f64>,
    pub ankles: Option<f64>,
    /// Unit the user typed the measurements in
    pub raw_unit: LengthUnit,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Syn value a user assigned to a food on a given day.
///
/// Keyed by (user, food, date) so re-submitting overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynValue {
    pub id: String,
    pub user_id: String,
    pub food_name: String,
    pub syn_value: f64,
    pub date: CalendarDate,
    pub notes: Option<String>,
    pub updated_at: String,
}

impl SynValue {
    /// Deterministic document ID for the (user, food, date) triple.
    pub fn document_id(user_id: &str, food_name: &str, date: &CalendarDate) -> String {
        let safe_food = urlencoding::encode(&food_name.trim().to_lowercase()).into_owned();
        format!("{}_{}_{}", user_id, safe_food, date)
    }
}
