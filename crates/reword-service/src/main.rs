//! Reword Service - paraphrase-bot backend
//!
//! This is the main entry point for the reword service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reword_service::{create_router, sweep, AppState, ServiceConfig};
use reword_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reword=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Reword Service");

    // Load configuration from environment; a missing key pool is fatal.
    let config = ServiceConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        gemini_keys = config.gemini_api_keys.len(),
        daily_limit = config.limits.daily_limit,
        verification_threshold = config.limits.verification_threshold,
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // Build app state
    let state = AppState::new(store.clone(), config.clone())?;

    // Background sweep of expired verification prompts
    let sweep_interval = std::time::Duration::from_secs(config.sweep_interval_seconds);
    tokio::spawn(sweep::run(store as Arc<dyn Store>, sweep_interval));

    // Create the router
    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
