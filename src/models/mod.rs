// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod connect_key;
pub mod lenient;
pub mod logs;
pub mod profile;

pub use connect_key::ConnectKey;
pub use logs::{ExerciseLog, MealLog, MeasurementLog, SynValue, WeightLog};
pub use profile::{Goal, UserSettings};
