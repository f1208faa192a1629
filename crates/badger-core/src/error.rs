//! Unified error types for the badger core library.
//!
//! This module provides a unified error type [`BadgerError`] that covers all
//! failure modes across the badger system. Each module also has its own
//! specific error type (DirectoryError, GuestError, ConfigError, StorageError)
//! for internal use.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! # Example
//!
//! ```rust
//! use badger_core::error::{BadgerError, Result};
//!
//! fn find(id: &str) -> Result<()> {
//!     Err(BadgerError::GuestNotFound(id.to_string()))
//! }
//!
//! assert!(find("abc").unwrap_err().is_expected_state());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all badger operations.
#[derive(Debug, Error)]
pub enum BadgerError {
    // =========================================================================
    // DIRECTORY ERRORS
    // =========================================================================
    /// The directory backend cannot be reached.
    #[error("Guest directory is unavailable: {0}. Check connectivity and try again.")]
    DirectoryUnavailable(String),

    /// A path or key is not usable in the directory.
    #[error("Invalid directory path: {0}")]
    InvalidPath(String),

    /// The directory refused a write.
    #[error("Directory write rejected: {0}")]
    WriteRejected(String),

    // =========================================================================
    // GUEST ERRORS
    // =========================================================================
    /// No guest is registered under the given id.
    #[error("Guest not found: '{0}'")]
    GuestNotFound(String),

    /// The guest name is too short.
    #[error("Guest name must have at least {min} characters (got {actual})")]
    NameTooShort {
        /// Minimum accepted length.
        min: usize,
        /// Actual length provided.
        actual: usize,
    },

    /// The table number is not valid.
    #[error("Table number must be greater than zero")]
    InvalidTable,

    /// A stored guest record is corrupt.
    #[error("Malformed guest record: {0}")]
    MalformedRecord(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for badger operations.
pub type Result<T> = std::result::Result<T, BadgerError>;

impl BadgerError {
    /// Returns `true` if this error comes from the directory backend.
    #[inline]
    #[must_use]
    pub const fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable(_) | Self::InvalidPath(_) | Self::WriteRejected(_)
        )
    }

    /// Returns `true` if this error concerns guest data or registration input.
    #[inline]
    #[must_use]
    pub const fn is_guest_error(&self) -> bool {
        matches!(
            self,
            Self::GuestNotFound(_)
                | Self::NameTooShort { .. }
                | Self::InvalidTable
                | Self::MalformedRecord(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::IoError(_))
    }

    /// Returns `true` for conditions a user is expected to run into, as
    /// opposed to system failures.
    #[inline]
    #[must_use]
    pub const fn is_expected_state(&self) -> bool {
        matches!(self, Self::GuestNotFound(_))
    }

    /// Returns `true` if retrying later may succeed without any change.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::DirectoryUnavailable(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidPath(_) | Self::NameTooShort { .. } | Self::InvalidTable => 400,

            // 404 Not Found
            Self::GuestNotFound(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict - refused by the backend
            Self::WriteRejected(_) => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error - server-side issues
            Self::MalformedRecord(_) | Self::PersistenceError(_) | Self::IoError(_) => 500,

            // 503 Service Unavailable - backend connectivity
            Self::DirectoryUnavailable(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DirectoryUnavailable(_) => "DIRECTORY_UNAVAILABLE",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::WriteRejected(_) => "WRITE_REJECTED",
            Self::GuestNotFound(_) => "GUEST_NOT_FOUND",
            Self::NameTooShort { .. } => "NAME_TOO_SHORT",
            Self::InvalidTable => "INVALID_TABLE",
            Self::MalformedRecord(_) => "MALFORMED_RECORD",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::directory::DirectoryError> for BadgerError {
    fn from(err: crate::directory::DirectoryError) -> Self {
        use crate::directory::DirectoryError;
        match err {
            DirectoryError::InvalidPath { path, reason } => {
                Self::InvalidPath(format!("{path}: {reason}"))
            }
            DirectoryError::Unavailable { message } => Self::DirectoryUnavailable(message),
            DirectoryError::Rejected { path, message } => {
                Self::WriteRejected(format!("{path}: {message}"))
            }
            DirectoryError::Persistence { message } | DirectoryError::Internal { message } => {
                Self::PersistenceError(message)
            }
        }
    }
}

impl From<crate::guest::GuestError> for BadgerError {
    fn from(err: crate::guest::GuestError) -> Self {
        use crate::guest::GuestError;
        match err {
            GuestError::NameTooShort { min, actual } => Self::NameTooShort { min, actual },
            GuestError::InvalidTable => Self::InvalidTable,
            GuestError::NotFound { id } => Self::GuestNotFound(id),
            GuestError::Malformed { id, message } => {
                Self::MalformedRecord(format!("{id}: {message}"))
            }
            GuestError::Directory(e) => e.into(),
        }
    }
}

impl From<crate::config::ConfigError> for BadgerError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path.into()),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::storage::StorageError> for BadgerError {
    fn from(err: crate::storage::StorageError) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
