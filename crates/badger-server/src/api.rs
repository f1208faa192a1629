//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `guests` - Guest registration, search and live lists
//! - `admissions` - Entrance check-in
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod admissions;
pub mod error;
pub mod guests;
pub mod health;
pub mod openapi;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                     - Health check
/// /api
/// ├── /guests                 - List, register
/// │   ├── /search?q=          - Name prefix search
/// │   ├── /stream[?q=]        - Live list (Server-Sent Events)
/// │   └── /{id}               - Get, update, delete
/// ├── /admissions/{code}      - Admit a scanned guest
/// └── /openapi.json           - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/guests", guests::router())
                .nest("/admissions", admissions::router()),
        )
        .with_state(state)
}

/// The router wrapped in request tracing, response compression and
/// permissive CORS, as served. Event streams are never compressed.
pub fn app(state: SharedState) -> Router {
    create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive()),
    )
}
