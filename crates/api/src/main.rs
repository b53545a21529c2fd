//! HTTP API for the Neighbors marketplace.
//!
//! Serves registration and login, the ranked task feed, task responses and
//! user karma over JSON.

mod auth;
mod config;
mod error;
mod extract;
mod routes;
mod state;

use std::sync::Arc;

use database::Database;
use neighbors_core::SystemClock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting Neighbors API");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Build application state
    let tokens = TokenIssuer::new(config.jwt_secret.clone(), config.token_ttl_secs);
    let state = AppState::new(db.clone(), Arc::new(SystemClock), tokens);

    let app = routes::router().with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "Neighbors API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
