// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connect key lifecycle over HTTP.
//!
//! Issue with a session, verify with the key, use the key on protected
//! routes, and check that reissue and expiry cut old keys off.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use slimbuddy_tracker::time_utils::ManualClock;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

async fn verify(app: &axum::Router, key: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/connect/verify")
                .header("X-Connect-Key", key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn profile_with_key(app: &axum::Router, key: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/api/user_profile")
                .header("X-Connect-Key", key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

fn is_key_shaped(key: &str) -> bool {
    let groups: Vec<&str> = key.split('-').collect();
    groups.len() == 5
        && groups[0] == "SB"
        && groups[1..].iter().map(|g| g.len()).eq([4, 3, 1, 4])
        && key
            .chars()
            .all(|c| c == '-' || c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[tokio::test]
async fn test_issue_returns_key_and_expiry() {
    let (app, state, store) = common::create_test_app();
    let token = common::create_test_jwt("u1", &state.config.jwt_secret);

    let before = Utc::now();
    let response = common::send_json(
        &app,
        "POST",
        "/api/connect/issue",
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

    let body = common::body_json(response).await;
    assert_eq!(body["ok"], true);
    let key = body["connect_key"].as_str().unwrap();
    assert!(is_key_shaped(key), "unexpected key {key}");

    let expires_at: DateTime<Utc> = body["expires_at"].as_str().unwrap().parse().unwrap();
    let ttl = expires_at - before;
    assert!(ttl > Duration::minutes(29) && ttl <= Duration::minutes(31));

    // Only the hash is kept
    let records = store.records_for("u1");
    assert_eq!(records.len(), 1);
    assert_ne!(records[0].key_hash, key);
    assert_eq!(records[0].key_hash.len(), 64);
}

#[tokio::test]
async fn test_issue_requires_auth() {
    let (app, _, _) = common::create_test_app();

    let response = common::send_json(&app, "POST", "/api/connect/issue", None, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_issued_key() {
    let (app, state, _) = common::create_test_app();
    let key = common::issue_key_for(&app, &state, "u1").await;

    let response = verify(&app, &key).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["user_id"], "u1");
    assert!(body["label"].is_null());
}

#[tokio::test]
async fn test_connect_key_authenticates_protected_routes() {
    let (app, state, _) = common::create_test_app();
    let key = common::issue_key_for(&app, &state, "u1").await;

    let response = profile_with_key(&app, &key).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["auth_via"], "connect_key");

    // Authorization: Connect <key> works too, in any case
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user_profile")
                .header(header::AUTHORIZATION, format!("Connect {}", key.to_lowercase()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reissue_revokes_previous_key() {
    let (app, state, store) = common::create_test_app();

    let first = common::issue_key_for(&app, &state, "u1").await;
    let second = common::issue_key_for(&app, &state, "u1").await;
    assert_ne!(first, second);

    let response = verify(&app, &first).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(profile_with_key(&app, &first).await.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(verify(&app, &second).await.status(), StatusCode::OK);

    let live = store
        .records_for("u1")
        .into_iter()
        .filter(|k| k.is_live())
        .count();
    assert_eq!(live, 1);
}

#[tokio::test]
async fn test_rejections_look_identical() {
    let (app, state, _) = common::create_test_app();
    let revoked = common::issue_key_for(&app, &state, "u1").await;
    common::issue_key_for(&app, &state, "u1").await;

    let revoked_body = common::body_json(verify(&app, &revoked).await).await;
    let unknown_body = common::body_json(verify(&app, "SB-AAAA-BBB-C-DDDD").await).await;

    assert_eq!(revoked_body, unknown_body);
    assert_eq!(unknown_body, serde_json::json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn test_expired_key_is_rejected() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let (app, state, _) = common::create_test_app_with_clock(clock.clone());
    let key = common::issue_key_for(&app, &state, "u1").await;

    clock.advance(Duration::minutes(29));
    assert_eq!(verify(&app, &key).await.status(), StatusCode::OK);

    clock.advance(Duration::minutes(1));
    assert_eq!(verify(&app, &key).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(profile_with_key(&app, &key).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_connect_key_cannot_issue_keys() {
    let (app, state, _) = common::create_test_app();
    let key = common::issue_key_for(&app, &state, "u1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/connect/issue")
                .header("X-Connect-Key", &key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // The presenting key is still good
    assert_eq!(verify(&app, &key).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_verify_malformed_and_missing_keys() {
    let (app, _, _) = common::create_test_app();

    let response = verify(&app, "SB-1234").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "invalid_connect_key");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/connect/verify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Protected routes treat a malformed key as plain unauthorized
    assert_eq!(profile_with_key(&app, "SB-1234").await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_liveness() {
    let (app, _, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/connect/verify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body, serde_json::json!({"ok": true, "route": "/api/connect/verify"}));
}

#[tokio::test]
async fn test_end_to_end_two_issues() {
    let (app, state, _) = common::create_test_app();

    let k1 = common::issue_key_for(&app, &state, "u1").await;
    assert!(is_key_shaped(&k1));
    let body = common::body_json(verify(&app, &k1).await).await;
    assert_eq!(body["user_id"], "u1");

    common::issue_key_for(&app, &state, "u1").await;
    assert_eq!(verify(&app, &k1).await.status(), StatusCode::UNAUTHORIZED);
}
