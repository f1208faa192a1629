//! Admission endpoint used by the entrance scanner.
//!
//! The scanner posts the decoded QR contents and renders whatever comes
//! back. Every attempt resolves to one of four outcomes; the body always has
//! the same shape so the client never has to special-case errors.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use badger_core::{AdmissionOutcome, Guest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the admissions router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/{code}", post(admit_guest))
}

/// Result of scanning a guest code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "outcome": "admitted",
    "guest": {
        "id": "0192b3c4d5e67f808a9b0c1d2e3f4a5b",
        "name": "José Á.",
        "nameNormalized": "jose a.",
        "guests": 2,
        "table": 7,
        "status": "present"
    },
    "message": null
}))]
pub struct AdmissionResponse {
    /// One of `admitted`, `already_admitted`, `not_found`, `error`.
    #[schema(example = "admitted")]
    pub outcome: String,

    /// The guest, for `admitted` and `already_admitted`.
    #[schema(nullable)]
    pub guest: Option<Guest>,

    /// Why the attempt failed, for `error`.
    #[schema(nullable)]
    pub message: Option<String>,
}

impl From<AdmissionOutcome> for AdmissionResponse {
    fn from(outcome: AdmissionOutcome) -> Self {
        let code = outcome.code().to_string();
        match outcome {
            AdmissionOutcome::Admitted(guest) | AdmissionOutcome::AlreadyAdmitted(guest) => {
                Self {
                    outcome: code,
                    guest: Some(guest),
                    message: None,
                }
            }
            AdmissionOutcome::NotFound => Self {
                outcome: code,
                guest: None,
                message: None,
            },
            AdmissionOutcome::Error(message) => Self {
                outcome: code,
                guest: None,
                message: Some(message),
            },
        }
    }
}

/// HTTP status reported for an admission outcome.
#[must_use]
pub const fn outcome_status(outcome: &AdmissionOutcome) -> StatusCode {
    match outcome {
        AdmissionOutcome::Admitted(_) => StatusCode::OK,
        AdmissionOutcome::AlreadyAdmitted(_) => StatusCode::CONFLICT,
        AdmissionOutcome::NotFound => StatusCode::NOT_FOUND,
        AdmissionOutcome::Error(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Admit the guest identified by a scanned code.
#[utoipa::path(
    post,
    path = "/api/admissions/{code}",
    tag = "admissions",
    operation_id = "admitGuest",
    summary = "Admit a guest",
    description = "Marks a waiting guest as present. A guest that is already \
        present is reported as `already_admitted` and left untouched; when two \
        scanners submit the same code at once exactly one of them gets \
        `admitted`. Directory failures are reported as `error` and leave the \
        guest's status unchanged. Nothing is retried.",
    params(("code" = String, Path, description = "Scanned QR contents (the guest id)")),
    responses(
        (status = 200, description = "Guest admitted", body = AdmissionResponse),
        (status = 404, description = "No guest for this code", body = AdmissionResponse),
        (status = 409, description = "Guest was already admitted", body = AdmissionResponse),
        (status = 503, description = "Directory failure, nothing written", body = AdmissionResponse)
    )
)]
pub async fn admit_guest(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> (StatusCode, Json<AdmissionResponse>) {
    let outcome = state.reconciler.admit(&code).await;
    (outcome_status(&outcome), Json(outcome.into()))
}
