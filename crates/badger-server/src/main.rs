//! # badger-server
//!
//! HTTP server for the badger guest check-in system.
//!
//! This binary provides:
//! - REST API for guest registration, search and admission
//! - Live guest lists over Server-Sent Events
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! BADGER__DIRECTORY__PERSIST=false cargo run --package badger-server
//!
//! # Production
//! BADGER_CONFIG=/etc/badger/config.toml ./badger-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use badger_core::Config;
use badger_server::logging;
use badger_server::state::{AppState, SharedState};
use tokio::net::TcpListener;
use tracing::info;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "BADGER_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    logging::init(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting badger-server");

    let addr = config.bind_address();
    let state = AppState::new(config)?.shared();

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on {}", addr);

    tokio::spawn(shutdown_on_signal(Arc::clone(&state)));
    badger_server::serve(listener, state).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_on_signal(state: SharedState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
    state.begin_shutdown();
}
