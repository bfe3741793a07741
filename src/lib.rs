// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! SlimBuddy tracker: health logging backend for web and agent clients
//!
//! Users log weight, meals, exercise and measurements in whatever units
//! they think in; everything is stored canonically (kg, cm, `YYYY-MM-DD`).
//! Conversational agents act on a user's behalf with short-lived connect
//! keys instead of session tokens.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::ConnectKeyService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub connect_keys: ConnectKeyService,
}
