//! # badger-server
//!
//! HTTP server library for the badger guest check-in system.
//!
//! This library provides the API handlers, state management and logging
//! setup used by the `badger-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;

use tokio::net::TcpListener;

use crate::state::SharedState;

/// Serve the API on `listener` until [`AppState::begin_shutdown`] is called.
///
/// Open guest streams are closed when shutdown begins, so in-flight
/// connections can drain.
///
/// [`AppState::begin_shutdown`]: state::AppState::begin_shutdown
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    let shutdown = state.shutdown_requested();
    axum::serve(listener, api::app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
