//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. In Cloud Run the same
//! variables arrive through secret bindings.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL, allowed as a CORS origin
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Lifetime of a newly issued connect key
    pub connect_key_ttl: chrono::Duration,
    /// Expected `aud` claim on session JWTs; unchecked when `None`
    pub jwt_audience: Option<String>,

    // --- Secrets ---
    /// HS256 secret the auth provider signs session JWTs with (raw bytes)
    pub jwt_secret: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            connect_key_ttl: chrono::Duration::minutes(DEFAULT_CONNECT_KEY_TTL_MINUTES),
            jwt_audience: None,
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

const DEFAULT_CONNECT_KEY_TTL_MINUTES: i64 = 30;
/// One year
const MAX_CONNECT_KEY_TTL_MINUTES: i64 = 60 * 24 * 365;

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            connect_key_ttl: parse_ttl_minutes(env::var("CONNECT_KEY_TTL_MINUTES").ok())?,
            jwt_audience: env::var("SUPABASE_JWT_AUDIENCE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),

            jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .map(|v| v.trim().to_string())
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?
                .into_bytes(),
        })
    }
}

fn parse_ttl_minutes(raw: Option<String>) -> Result<chrono::Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(chrono::Duration::minutes(DEFAULT_CONNECT_KEY_TTL_MINUTES));
    };
    match raw.trim().parse::<i64>() {
        Ok(minutes) if (1..=MAX_CONNECT_KEY_TTL_MINUTES).contains(&minutes) => {
            Ok(chrono::Duration::minutes(minutes))
        }
        _ => Err(ConfigError::Invalid {
            name: "CONNECT_KEY_TTL_MINUTES",
            value: raw,
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
