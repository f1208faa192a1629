//! Guest registration and lookup endpoints.
//!
//! Guests are listed in normalized-name order. Search matches a prefix of
//! the normalized name, so `jose` finds "José Álvarez". The stream endpoint
//! pushes a fresh list over Server-Sent Events every time the directory
//! changes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use badger_core::{Guest, GuestDraft, GuestResult, GuestSummary};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// SSE event name carrying a list snapshot.
pub const GUESTS_EVENT: &str = "guests";

/// SSE event name sent once when the subscription fails.
pub const ERROR_EVENT: &str = "error";

/// Creates the guests router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_guests).post(create_guest))
        .route("/search", get(search_guests))
        .route("/stream", get(stream_guests))
        .route(
            "/{id}",
            get(get_guest).put(update_guest).delete(delete_guest),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A list of guests with head counts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "guests": [{
        "id": "0192b3c4d5e67f808a9b0c1d2e3f4a5b",
        "name": "José Á.",
        "nameNormalized": "jose a.",
        "guests": 2,
        "table": 7,
        "status": "waiting"
    }],
    "summary": { "total": 1, "present": 0, "waiting": 1 }
}))]
pub struct GuestListResponse {
    /// Guests ordered by normalized name.
    pub guests: Vec<Guest>,

    /// Counts over `guests`.
    pub summary: GuestSummary,
}

impl From<Vec<Guest>> for GuestListResponse {
    fn from(guests: Vec<Guest>) -> Self {
        let summary = GuestSummary::from_guests(&guests);
        Self { guests, summary }
    }
}

/// Query parameters for name search.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Name prefix. Case and diacritics are ignored.
    #[param(example = "jose")]
    #[serde(default)]
    pub q: String,
}

/// Query parameters for the live guest stream.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct StreamQuery {
    /// Optional name prefix; every guest is streamed when absent.
    #[param(example = "jose")]
    pub q: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List every guest.
#[utoipa::path(
    get,
    path = "/api/guests",
    tag = "guests",
    operation_id = "listGuests",
    summary = "List guests",
    description = "Returns every registered guest ordered by normalized name, \
        with the number of guests present and still waiting.",
    responses(
        (status = 200, description = "Guest list", body = GuestListResponse),
        (status = 503, description = "Directory unavailable", body = super::error::ErrorResponse)
    )
)]
pub async fn list_guests(State(state): State<SharedState>) -> ApiResult<Json<GuestListResponse>> {
    let guests = state.guests.list_guests().await?;
    Ok(Json(guests.into()))
}

/// Register a guest.
#[utoipa::path(
    post,
    path = "/api/guests",
    tag = "guests",
    operation_id = "createGuest",
    summary = "Register a guest",
    description = "Registers a guest with status `waiting`. The returned id is \
        the value to encode in the guest's QR code.",
    request_body = GuestDraft,
    responses(
        (status = 201, description = "Guest registered", body = Guest),
        (status = 400, description = "Name too short or invalid table", body = super::error::ErrorResponse),
        (status = 503, description = "Directory unavailable", body = super::error::ErrorResponse)
    )
)]
pub async fn create_guest(
    State(state): State<SharedState>,
    Json(draft): Json<GuestDraft>,
) -> ApiResult<(StatusCode, Json<Guest>)> {
    let guest = state.guests.add_guest(draft).await?;
    Ok((StatusCode::CREATED, Json(guest)))
}

/// Search guests by name prefix.
#[utoipa::path(
    get,
    path = "/api/guests/search",
    tag = "guests",
    operation_id = "searchGuests",
    summary = "Search guests by name",
    description = "Returns the guests whose normalized name starts with the \
        normalized query, up to the configured search limit.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching guests", body = GuestListResponse),
        (status = 503, description = "Directory unavailable", body = super::error::ErrorResponse)
    )
)]
pub async fn search_guests(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<GuestListResponse>> {
    let guests = state.guests.find_guests(&query.q).await?;
    Ok(Json(guests.into()))
}

/// Stream guest list snapshots.
#[utoipa::path(
    get,
    path = "/api/guests/stream",
    tag = "guests",
    operation_id = "streamGuests",
    summary = "Stream the guest list",
    description = "Server-Sent Events. Sends a `guests` event with the full \
        (optionally filtered) list right away and again after every change. \
        If the directory subscription fails an `error` event is sent and the \
        stream ends. Streams also end when the server shuts down.",
    params(StreamQuery),
    responses(
        (status = 200, description = "Event stream of guest lists", content_type = "text/event-stream", body = GuestListResponse)
    )
)]
pub async fn stream_guests(
    State(state): State<SharedState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let snapshots = match query.q.as_deref() {
        Some(name) => state.guests.search_guests(name),
        None => state.guests.guests(),
    };
    tracing::debug!(query = ?query.q, "Guest stream opened");

    let events = snapshots
        .map(snapshot_event)
        .take_until(state.shutdown_requested());
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Get a single guest.
#[utoipa::path(
    get,
    path = "/api/guests/{id}",
    tag = "guests",
    operation_id = "getGuest",
    summary = "Get a guest",
    params(("id" = String, Path, description = "Guest id (the QR code contents)")),
    responses(
        (status = 200, description = "Guest found", body = Guest),
        (status = 404, description = "No such guest", body = super::error::ErrorResponse)
    )
)]
pub async fn get_guest(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Guest>> {
    state
        .guests
        .get_guest(&id)
        .await?
        .map(Json)
        .ok_or_else(|| guest_not_found(&id))
}

/// Update a guest's registration details.
#[utoipa::path(
    put,
    path = "/api/guests/{id}",
    tag = "guests",
    operation_id = "updateGuest",
    summary = "Update a guest",
    description = "Rewrites name, party size and table. The admission status \
        is not affected.",
    params(("id" = String, Path, description = "Guest id")),
    request_body = GuestDraft,
    responses(
        (status = 200, description = "Guest updated", body = Guest),
        (status = 400, description = "Name too short or invalid table", body = super::error::ErrorResponse),
        (status = 404, description = "No such guest", body = super::error::ErrorResponse)
    )
)]
pub async fn update_guest(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(draft): Json<GuestDraft>,
) -> ApiResult<Json<Guest>> {
    let guest = state.guests.update_guest(&id, draft).await?;
    Ok(Json(guest))
}

/// Delete a guest.
#[utoipa::path(
    delete,
    path = "/api/guests/{id}",
    tag = "guests",
    operation_id = "deleteGuest",
    summary = "Delete a guest",
    params(("id" = String, Path, description = "Guest id")),
    responses(
        (status = 204, description = "Guest deleted"),
        (status = 404, description = "No such guest", body = super::error::ErrorResponse)
    )
)]
pub async fn delete_guest(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.guests.get_guest(&id).await?.is_none() {
        return Err(guest_not_found(&id));
    }
    state.guests.remove_guest(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

fn guest_not_found(id: &str) -> ApiError {
    ApiError::NotFound {
        error_code: "guest_not_found".to_string(),
        message: format!("Guest not found: '{id}'"),
    }
}

fn snapshot_event(snapshot: GuestResult<Vec<Guest>>) -> Result<Event, axum::Error> {
    match snapshot {
        Ok(guests) => Event::default()
            .event(GUESTS_EVENT)
            .json_data(GuestListResponse::from(guests)),
        Err(e) => {
            tracing::warn!(error = %e, "Guest stream failed");
            Ok(Event::default().event(ERROR_EVENT).data(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use badger_core::GuestStatus;

    fn guest(name: &str, status: GuestStatus) -> Guest {
        Guest {
            id: name.to_lowercase(),
            name: name.to_string(),
            name_normalized: badger_core::normalize(name),
            guests: 0,
            table: 1,
            status,
        }
    }

    #[test]
    fn test_list_response_counts_statuses() {
        let response = GuestListResponse::from(vec![
            guest("Ana", GuestStatus::Present),
            guest("Bea", GuestStatus::Waiting),
            guest("Cris", GuestStatus::Waiting),
        ]);
        assert_eq!(response.summary.total, 3);
        assert_eq!(response.summary.present, 1);
        assert_eq!(response.summary.waiting, 2);
    }

    #[test]
    fn test_search_query_defaults_to_empty() {
        let query: SearchQuery = serde_json::from_str("{}").unwrap();
        assert!(query.q.is_empty());
    }

    #[test]
    fn test_list_response_uses_camel_case_guest_fields() {
        let json = serde_json::to_string(&GuestListResponse::from(vec![guest(
            "José",
            GuestStatus::Waiting,
        )]))
        .unwrap();
        assert!(json.contains("\"nameNormalized\":\"jose\""));
        assert!(json.contains("\"status\":\"waiting\""));
    }
}
