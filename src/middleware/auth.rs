// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request authentication: connect keys and session JWTs.
//!
//! A connect key (`X-Connect-Key` or `Authorization: Connect <key>`) wins
//! when present; a presented key that fails verification is not retried as
//! a session. Otherwise the session JWT is read from the cookie, then from
//! the `Authorization` header.

use crate::error::AppError;
use crate::services::connect_key::{extract_connect_key, ConnectKeyError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie the web client keeps its session JWT in.
pub const SESSION_COOKIE: &str = "slimbuddy_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// How the caller proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthVia {
    Session,
    ConnectKey,
}

/// Authenticated user, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub via: AuthVia,
}

/// Middleware that requires a valid connect key or session JWT.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = resolve_auth(&state, &jar, request.headers()).await?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

async fn resolve_auth(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    if let Some(candidate) = extract_connect_key(headers) {
        let verified = state
            .connect_keys
            .verify(candidate)
            .await
            .map_err(|e| match e {
                ConnectKeyError::InvalidFormat => {
                    tracing::debug!("Malformed connect key presented");
                    AppError::Unauthorized
                }
                ConnectKeyError::Unauthenticated(reason) => {
                    tracing::debug!(reason = %reason, "Connect key rejected");
                    AppError::Unauthorized
                }
                other => AppError::ConnectKey(other),
            })?;

        return Ok(AuthUser {
            user_id: verified.owner_user_id,
            email: None,
            via: AuthVia::ConnectKey,
        });
    }

    // Try cookie first, then header
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => bearer_token(headers).ok_or(AppError::Unauthorized)?,
    };

    let claims = decode_session_jwt(
        &token,
        &state.config.jwt_secret,
        state.config.jwt_audience.as_deref(),
    )?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        via: AuthVia::Session,
    })
}

/// Validate an HS256 session JWT. `aud` is checked only when configured.
pub fn decode_session_jwt(
    token: &str,
    secret: &[u8],
    audience: Option<&str>,
) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    match audience {
        Some(aud) => {
            validation.set_audience(&[aud]);
            validation.set_required_spec_claims(&["exp", "aud"]);
        }
        None => validation.validate_aud = false,
    }

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Session JWT rejected");
        AppError::InvalidToken
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(token_data.claims)
}

/// First JWT-shaped token in the `Authorization` header.
///
/// Clients send `Bearer <jwt>`, a bare `<jwt>`, or the token buried in
/// other text; all three are accepted.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();

    raw.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !is_base64url(c)))
        .find(|word| looks_like_jwt(word))
        .map(str::to_string)
}

fn is_base64url(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn looks_like_jwt(word: &str) -> bool {
    let segments: Vec<&str> = word.split('.').collect();
    segments.len() == 3
        && segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(is_base64url))
}

/// Create a session JWT, as the auth provider would. Used by tests and
/// local tooling.
pub fn create_session_jwt(
    user_id: &str,
    email: Option<&str>,
    audience: Option<&str>,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 60 * 60, // 1 hour
        email: email.map(str::to_string),
        role: Some("authenticated".to_string()),
        aud: audience.map(str::to_string),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
