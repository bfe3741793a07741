// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goals and settings owned by a user.

use serde::{Deserialize, Serialize};

use crate::services::normalize::CalendarDate;

/// Weight goal. The target is always kilograms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    /// e.g. "weight_loss", "maintenance"
    pub goal_type: String,
    pub target_kg: f64,
    pub target_date: Option<CalendarDate>,
    pub created_at: String,
}

/// User settings document, keyed by user ID.
///
/// Written with an update mask so only the fields a PATCH supplied are
/// touched; see [`UserSettings::FIELDS`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    #[serde(default)]
    pub preferred_name: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    /// One of "kg", "lbs", "st_lbs"
    #[serde(default)]
    pub preferred_weight_unit: Option<String>,
    #[serde(default)]
    pub diet_preference: Option<String>,
    #[serde(default)]
    pub food_allergies: Option<String>,
    #[serde(default)]
    pub food_dislikes: Option<String>,
    #[serde(default)]
    pub typical_day: Option<String>,
    #[serde(default)]
    pub healthy_extra_a: Option<String>,
    #[serde(default)]
    pub healthy_extra_b: Option<String>,
    #[serde(default)]
    pub syn_limit: Option<f64>,
    /// Kilograms
    #[serde(default)]
    pub target_weight: Option<f64>,
    #[serde(default)]
    pub maintenance_mode_enabled: Option<bool>,
    #[serde(default)]
    pub updated_at: String,
}

impl UserSettings {
    /// Every patchable field name, as stored.
    pub const FIELDS: &'static [&'static str] = &[
        "preferred_name",
        "tone",
        "preferred_weight_unit",
        "diet_preference",
        "food_allergies",
        "food_dislikes",
        "typical_day",
        "healthy_extra_a",
        "healthy_extra_b",
        "syn_limit",
        "target_weight",
        "maintenance_mode_enabled",
    ];
}
