// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use slimbuddy_tracker::config::Config;
use slimbuddy_tracker::db::{FirestoreDb, MemoryKeyStore};
use slimbuddy_tracker::middleware::auth::create_session_jwt;
use slimbuddy_tracker::routes::create_router;
use slimbuddy_tracker::services::ConnectKeyService;
use slimbuddy_tracker::time_utils::Clock;
use slimbuddy_tracker::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Offline app: Firestore calls fail, connect keys live in memory.
/// Returns the router, the shared state and the key store behind it.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryKeyStore) {
    let store = MemoryKeyStore::new();
    let connect_keys = ConnectKeyService::new(Arc::new(store.clone()));
    let (app, state) = build_app(connect_keys);
    (app, state, store)
}

/// Like [`create_test_app`] but with a caller-controlled clock.
#[allow(dead_code)]
pub fn create_test_app_with_clock(
    clock: Arc<dyn Clock>,
) -> (axum::Router, Arc<AppState>, MemoryKeyStore) {
    let store = MemoryKeyStore::new();
    let connect_keys = ConnectKeyService::with_sources(
        Arc::new(store.clone()),
        clock,
        Arc::new(ring::rand::SystemRandom::new()),
    );
    let (app, state) = build_app(connect_keys);
    (app, state, store)
}

#[allow(dead_code)]
fn build_app(connect_keys: ConnectKeyService) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::default(),
        db: test_db_offline(),
        connect_keys,
    });

    (create_router(state.clone()), state)
}

/// Create a session JWT signed with the test secret.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_session_jwt(user_id, Some("test@example.com"), None, signing_key)
        .expect("Failed to create JWT")
}

/// Send a JSON request with an optional bearer token.
#[allow(dead_code)]
pub async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Issue a connect key over HTTP as `user_id` and return the plaintext.
#[allow(dead_code)]
pub async fn issue_key_for(app: &axum::Router, state: &AppState, user_id: &str) -> String {
    let token = create_test_jwt(user_id, &state.config.jwt_secret);
    let response = send_json(
        app,
        "POST",
        "/api/connect/issue",
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    body_json(response).await["connect_key"]
        .as_str()
        .unwrap()
        .to_string()
}
