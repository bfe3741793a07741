// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connect key routes: issue (signed-in users) and verify (agents).

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, AuthVia};
use crate::services::connect_key::extract_connect_key;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const VERIFY_PATH: &str = "/api/connect/verify";

/// Routes an agent can call before it holds a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route(VERIFY_PATH, get(verify_liveness).post(verify_key))
}

/// Routes that require authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/connect/issue", post(issue_key))
}

// ─── Issue ───────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IssueKeyResponse {
    pub ok: bool,
    /// Shown to the user once; never retrievable again
    pub connect_key: String,
    pub expires_at: String,
}

/// Issue a fresh connect key, revoking the caller's previous ones.
async fn issue_key(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<IssueKeyResponse>> {
    if user.via != AuthVia::Session {
        return Err(AppError::Forbidden(
            "Connect keys can only be issued from a signed-in session".to_string(),
        ));
    }

    let issued = state
        .connect_keys
        .issue(&user.user_id, state.config.connect_key_ttl)
        .await?;

    Ok(Json(IssueKeyResponse {
        ok: true,
        expires_at: format_utc_rfc3339(issued.expires_at),
        connect_key: issued.plain_key,
    }))
}

// ─── Verify ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct VerifyLivenessResponse {
    pub ok: bool,
    pub route: &'static str,
}

async fn verify_liveness() -> Json<VerifyLivenessResponse> {
    Json(VerifyLivenessResponse {
        ok: true,
        route: VERIFY_PATH,
    })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyKeyResponse {
    pub ok: bool,
    pub user_id: String,
    pub expires_at: String,
    pub label: Option<String>,
}

/// Check the key in `X-Connect-Key` (or `Authorization: Connect`).
///
/// Malformed keys are 400; unknown, revoked and expired keys are all the
/// same 401.
async fn verify_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<VerifyKeyResponse>> {
    let candidate = extract_connect_key(&headers).ok_or_else(|| {
        AppError::BadRequest("Missing X-Connect-Key (or Authorization: Connect ...)".to_string())
    })?;

    let verified = state.connect_keys.verify(candidate).await?;

    Ok(Json(VerifyKeyResponse {
        ok: true,
        user_id: verified.owner_user_id,
        expires_at: format_utc_rfc3339(verified.expires_at),
        label: verified.label,
    }))
}
