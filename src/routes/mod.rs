// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod connect;
pub mod logs;
pub mod profile;

use crate::middleware::auth::require_auth;
use crate::services::connect_key::CONNECT_KEY_HEADER;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Characters of the `Authorization` header echoed by `/api/auth_echo`.
const AUTH_PREVIEW_CHARS: usize = 24;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

#[derive(Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub message: &'static str,
    pub timestamp: String,
}

/// Liveness including a round trip to the store.
async fn ping(State(state): State<Arc<AppState>>) -> (StatusCode, Json<PingResponse>) {
    let timestamp = format_utc_rfc3339(chrono::Utc::now());
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(PingResponse {
                ok: true,
                message: "SlimBuddy backend is alive",
                timestamp,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Ping could not reach the store");
            (
                StatusCode::BAD_GATEWAY,
                Json(PingResponse {
                    ok: false,
                    message: "Backend up but store unreachable",
                    timestamp,
                }),
            )
        }
    }
}

#[derive(Serialize)]
pub struct AuthEchoResponse {
    pub ok: bool,
    pub has_auth: bool,
    pub auth_preview: String,
}

/// Show whether an `Authorization` header arrived, truncated. For
/// debugging agent integrations.
async fn auth_echo(headers: HeaderMap) -> Json<AuthEchoResponse> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let auth_preview = if raw.is_empty() {
        "(none)".to_string()
    } else {
        let mut preview: String = raw.chars().take(AUTH_PREVIEW_CHARS).collect();
        preview.push('…');
        preview
    };

    Json(AuthEchoResponse {
        ok: true,
        has_auth: !raw.is_empty(),
        auth_preview,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(CONNECT_KEY_HEADER),
        ]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/ping", get(ping))
        .route("/api/auth_echo", get(auth_echo))
        .merge(connect::public_routes());

    // Protected routes (connect key or session required)
    let protected_routes = Router::new()
        .merge(logs::routes())
        .merge(profile::routes())
        .merge(connect::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
