// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SlimBuddy Tracker API Server
//!
//! Stores weight, meal, exercise and measurement logs and issues connect
//! keys that let conversational agents act for a signed-in user.

use slimbuddy_tracker::{
    config::Config, db::FirestoreDb, services::ConnectKeyService, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        connect_key_ttl_minutes = config.connect_key_ttl.num_minutes(),
        "Starting SlimBuddy Tracker API"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    // Connect keys live in Firestore alongside everything else
    let connect_keys = ConnectKeyService::new(Arc::new(db.clone()));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        connect_keys,
    });

    // Build router
    let app = slimbuddy_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slimbuddy_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
