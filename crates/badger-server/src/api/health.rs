//! Health check API endpoint.
//!
//! Reports directory connectivity, how the guest tree is stored and the
//! current head count, so a door display can tell a dead server from an
//! empty event.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use badger_core::GuestSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// How the guest directory keeps its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Persistence {
    /// Every write is saved to the data directory.
    File,
    /// Guests live only as long as the process.
    Memory,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "directory_online": true,
    "persistence": "file",
    "guests": { "total": 120, "present": 45, "waiting": 75 }
}))]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the guest list cannot be read.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Whether the guest directory is reachable.
    #[schema(example = true)]
    pub directory_online: bool,

    /// Where guests are stored.
    pub persistence: Persistence,

    /// Head count, absent when the guest list cannot be read.
    #[schema(nullable)]
    pub guests: Option<GuestSummary>,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns service status, directory connectivity, the storage \
        mode and the current head count. `status` is `degraded` and `guests` \
        is null while the guest directory cannot be read.",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let directory_online = state.directory_online();
    let guests = if directory_online {
        match state.guests.list_guests().await {
            Ok(guests) => Some(GuestSummary::from_guests(&guests)),
            Err(e) => {
                tracing::warn!(error = %e, "Health check could not read guests");
                None
            }
        }
    } else {
        None
    };

    Json(HealthResponse {
        status: if guests.is_some() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        directory_online,
        persistence: if state.persistent() {
            Persistence::File
        } else {
            Persistence::Memory
        },
        guests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "degraded".to_string(),
            version: "0.1.0".to_string(),
            directory_online: false,
            persistence: Persistence::Memory,
            guests: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["directory_online"], false);
        assert_eq!(json["persistence"], "memory");
        assert!(json["guests"].is_null());
    }
}
