// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::connect_key::ConnectKeyError;
use crate::services::normalize::NormalizeError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] NormalizeError),

    #[error(transparent)]
    ConnectKey(#[from] ConnectKeyError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "invalid_input", Some(err.to_string()))
            }
            AppError::ConnectKey(err) => match err {
                ConnectKeyError::InvalidFormat => (
                    StatusCode::BAD_REQUEST,
                    "invalid_connect_key",
                    Some(err.to_string()),
                ),
                ConnectKeyError::Unauthenticated(reason) => {
                    tracing::debug!(reason = %reason, "Connect key rejected");
                    (StatusCode::UNAUTHORIZED, "unauthorized", None)
                }
                ConnectKeyError::StoreUnavailable(msg) => {
                    tracing::error!(error = %msg, "Connect key store unavailable");
                    (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", None)
                }
                ConnectKeyError::RandomSource => {
                    tracing::error!("Secure random source failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
                }
                ConnectKeyError::InvalidTtl => {
                    tracing::error!("Connect key TTL out of range");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
                }
            },
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
