// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authgate API Server
//!
//! Registration, password and Google login, and JWT access/refresh tokens.

use anyhow::Context;
use authgate::{
    config::Config,
    db::{FirestoreDb, MemoryStore, UserStore},
    services::GoogleOidcVerifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Authgate API");

    // Firestore when a project is configured, otherwise an in-memory store
    let store: Arc<dyn UserStore> = match &config.gcp_project_id {
        Some(project_id) => Arc::new(
            FirestoreDb::new(project_id)
                .await
                .context("Failed to connect to Firestore")?,
        ),
        None => {
            tracing::warn!("GCP_PROJECT_ID not set; using in-memory user store");
            Arc::new(MemoryStore::new())
        }
    };

    if config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set; accepting any client id in Google logins");
    }

    let google = Arc::new(
        GoogleOidcVerifier::new().context("Failed to initialize Google token verifier")?,
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, google));

    // Build router
    let app = authgate::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("authgate=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
