//! OpenAPI specification generation for the badger API.
//!
//! The document is served at `/api/openapi.json` and written to the
//! workspace root by the `gen-openapi` binary for client generation.

use axum::Json;
use badger_core::{Guest, GuestDraft, GuestStatus, GuestSummary};
use utoipa::OpenApi;

use super::admissions::AdmissionResponse;
use super::error::ErrorResponse;
use super::guests::GuestListResponse;
use super::health::{HealthResponse, Persistence};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for badger.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "badger API",
        version = "0.1.0",
        description = r#"
# badger API

Guest registration and entrance check-in for events.

## Overview

1. **Register** guests with a name, party size and table. Each guest gets an
   id; encode it in a QR code and hand it to the guest.
2. **Find** guests by name. Matching ignores case and accents, so `jose`
   finds "José".
3. **Admit** guests at the entrance by posting the scanned code. A guest can
   be admitted once; scanning again reports `already_admitted`.

## Live updates

`GET /api/guests/stream` is a Server-Sent Events stream that pushes the whole
guest list (or the matches for `q`) whenever anything changes.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local badger server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "guests", description = "Guest registration, search and live lists"),
        (name = "admissions", description = "Entrance check-in by scanned code")
    ),
    paths(
        super::health::health_check,
        super::guests::list_guests,
        super::guests::create_guest,
        super::guests::search_guests,
        super::guests::stream_guests,
        super::guests::get_guest,
        super::guests::update_guest,
        super::guests::delete_guest,
        super::admissions::admit_guest,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            Persistence,
            Guest,
            GuestDraft,
            GuestStatus,
            GuestSummary,
            GuestListResponse,
            AdmissionResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "badger API");
        assert!(spec.paths.paths.contains_key("/api/guests/{id}"));
        assert!(spec.paths.paths.contains_key("/api/admissions/{code}"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"badger API\""));
        assert!(json.contains("AdmissionResponse"));
    }
}
