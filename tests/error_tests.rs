// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use slimbuddy_tracker::error::AppError;
use slimbuddy_tracker::services::connect_key::{ConnectKeyError, UnauthenticatedReason};
use slimbuddy_tracker::services::normalize::NormalizeError;

mod common;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    (status, common::body_json(response).await)
}

#[tokio::test]
async fn test_normalize_errors_are_bad_requests() {
    let (status, body) = render(NormalizeError::MissingField("stones").into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(body["details"], "stones: missing or not a number");
}

#[tokio::test]
async fn test_unauthenticated_reasons_are_indistinguishable() {
    let mut bodies = Vec::new();
    for reason in [
        UnauthenticatedReason::NotFound,
        UnauthenticatedReason::Revoked,
        UnauthenticatedReason::Expired,
    ] {
        let (status, body) = render(ConnectKeyError::Unauthenticated(reason).into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(body);
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(bodies[0].get("details").is_none());
}

#[tokio::test]
async fn test_connect_key_error_statuses() {
    let (status, _) = render(ConnectKeyError::InvalidFormat.into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = render(ConnectKeyError::StoreUnavailable("timeout".to_string()).into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    // Store internals are not echoed
    assert!(body.get("details").is_none());

    let (status, _) = render(ConnectKeyError::RandomSource.into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = render(ConnectKeyError::InvalidTtl.into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
}

#[tokio::test]
async fn test_forbidden_and_database_errors() {
    let (status, _) = render(AppError::Forbidden("no".to_string())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = render(AppError::Database("boom".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_internal_errors_hide_their_cause() {
    let err: AppError = anyhow::anyhow!("token signing key rejected").into();
    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}
