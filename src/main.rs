// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Todo-Billing API Server
//!
//! Serves per-user todo lists with a free-tier quota and Stripe
//! subscription upgrades.

use std::sync::Arc;
use todo_billing::{
    config::{Config, DatabaseBackend},
    db::{FirestoreDb, MemoryDb, SharedStore},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Todo-Billing API");

    // Initialize the store
    let db: SharedStore = match config.database {
        DatabaseBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db));
    tracing::info!(
        ttl_secs = config.user_cache_ttl_secs,
        "User cache initialized"
    );

    // Build router
    let app = todo_billing::routes::create_router(state);

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

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("todo_billing=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
