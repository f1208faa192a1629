//! Guest records and registration input.
//!
//! A guest's `id` is the directory key of its record. It is attached on read
//! and never stored inside the record body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::directory::DirectoryError;
use crate::normalize::normalize;

/// Stored field holding the normalized name; guest lists are ordered by it.
pub const NAME_INDEX: &str = "nameNormalized";

/// Stored field holding the admission status.
pub const STATUS_FIELD: &str = "status";

/// Errors from guest registration and lookup.
#[derive(Debug, Error)]
pub enum GuestError {
    /// The name is shorter than the configured minimum.
    #[error("Guest name must have at least {min} characters (got {actual})")]
    NameTooShort {
        /// Minimum accepted length.
        min: usize,
        /// Length of the trimmed name.
        actual: usize,
    },

    /// Table numbers start at 1.
    #[error("Table number must be greater than zero")]
    InvalidTable,

    /// No guest is stored under the given id.
    #[error("Guest not found: '{id}'")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// A stored record does not match the guest schema.
    #[error("Malformed guest record '{id}': {message}")]
    Malformed {
        /// Key of the record.
        id: String,
        /// Decoding failure.
        message: String,
    },

    /// The directory backend failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Result type for guest operations.
pub type GuestResult<T> = Result<T, GuestError>;

/// Admission status of a guest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    /// Registered, not yet at the entrance.
    #[default]
    Waiting,
    /// Admitted.
    Present,
}

impl GuestStatus {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Present => "present",
        }
    }

    /// Stored representation as a JSON value.
    #[must_use]
    pub fn to_value(self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

/// A registered guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "0192b3c4d5e67f808a9b0c1d2e3f4a5b",
    "name": "José Á.",
    "nameNormalized": "jose a.",
    "guests": 2,
    "table": 7,
    "status": "waiting"
}))]
pub struct Guest {
    /// Directory-assigned identifier, also encoded in the guest's QR code.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lowercased, diacritic-free form of `name` used for search and ordering.
    pub name_normalized: String,
    /// Number of people accompanying the guest.
    pub guests: u32,
    /// Seating table.
    pub table: u32,
    /// Admission status.
    pub status: GuestStatus,
}

/// Stored body of a guest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuestRecord {
    name: String,
    #[serde(default)]
    name_normalized: String,
    #[serde(default)]
    guests: u32,
    #[serde(default)]
    table: u32,
    #[serde(default)]
    status: GuestStatus,
}

impl Guest {
    /// Decode the record stored under `id`.
    pub fn from_record(id: &str, value: Value) -> GuestResult<Self> {
        let record: GuestRecord =
            serde_json::from_value(value).map_err(|e| GuestError::Malformed {
                id: id.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            id: id.to_string(),
            name: record.name,
            name_normalized: record.name_normalized,
            guests: record.guests,
            table: record.table,
            status: record.status,
        })
    }

    /// Stored body of this guest. `name_normalized` is always recomputed.
    #[must_use]
    pub fn to_record(&self) -> Value {
        let record = GuestRecord {
            name: self.name.clone(),
            name_normalized: normalize(&self.name),
            guests: self.guests,
            table: self.table,
            status: self.status,
        };
        serde_json::to_value(record).unwrap_or(Value::Null)
    }

    /// Whether the guest has already been admitted.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.status == GuestStatus::Present
    }
}

/// Registration form for a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "José Á.",
    "guests": 2,
    "table": 7
}))]
pub struct GuestDraft {
    /// Display name.
    #[schema(example = "José Á.", min_length = 3)]
    pub name: String,

    /// Number of people accompanying the guest.
    #[serde(default)]
    #[schema(example = 2, minimum = 0)]
    pub guests: u32,

    /// Seating table (1 or more).
    #[schema(example = 7, minimum = 1)]
    pub table: u32,
}

impl GuestDraft {
    /// Check the draft against the registration rules.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::NameTooShort`] or [`GuestError::InvalidTable`].
    pub fn validate(&self, min_name_length: usize) -> GuestResult<()> {
        let actual = self.name.trim().chars().count();
        if actual < min_name_length {
            return Err(GuestError::NameTooShort {
                min: min_name_length,
                actual,
            });
        }
        if self.table == 0 {
            return Err(GuestError::InvalidTable);
        }
        Ok(())
    }

    /// Stored body for a new registration: trimmed name, status `waiting`.
    #[must_use]
    pub fn into_record(self) -> Value {
        Guest {
            id: String::new(),
            name: self.name.trim().to_string(),
            name_normalized: String::new(),
            guests: self.guests,
            table: self.table,
            status: GuestStatus::Waiting,
        }
        .to_record()
    }
}

/// Head count over a guest list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "total": 120, "present": 45, "waiting": 75 }))]
pub struct GuestSummary {
    /// Number of registered guests.
    pub total: usize,
    /// Guests already admitted.
    pub present: usize,
    /// Guests not yet admitted.
    pub waiting: usize,
}

impl GuestSummary {
    /// Count guests by status.
    #[must_use]
    pub fn from_guests(guests: &[Guest]) -> Self {
        let present = guests.iter().filter(|g| g.is_present()).count();
        Self {
            total: guests.len(),
            present,
            waiting: guests.len() - present,
        }
    }
}
