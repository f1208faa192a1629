//! # badger-core
//!
//! Core logic for the badger guest check-in system.
//!
//! Guests are registered in a realtime directory, handed a QR code carrying
//! their directory id, and admitted at the entrance by scanning that code.
//!
//! ## Architecture
//!
//! - [`directory`] - Path-addressed realtime store: CRUD, conditional writes,
//!   live list and prefix-search subscriptions
//! - [`guest`] - Guest records, registration drafts and head counts
//! - [`guests`] - Typed guest collection over a directory
//! - [`admission`] - Reconciles a scanned code with the directory, once
//! - [`normalize`] - Diacritic-free lowercase search keys
//! - [`config`] - Layered configuration loading and validation
//! - [`storage`] - On-disk persistence for the directory tree
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod admission;
pub mod config;
pub mod directory;
pub mod error;
pub mod guest;
pub mod guests;
pub mod normalize;
pub mod storage;

// Re-export primary types for convenience
pub use admission::{AdmissionOutcome, AdmissionState, Reconciler};
pub use config::{
    Config, ConfigError, ConfigResult, DirectoryConfig, GuestsConfig, LoggingConfig, ServerConfig,
};
pub use directory::{
    Child, Directory, DirectoryError, DirectoryResult, Guard, ListQuery, MemoryDirectory,
    WriteOutcome,
};
pub use error::{BadgerError, Result};
pub use guest::{Guest, GuestDraft, GuestError, GuestResult, GuestStatus, GuestSummary};
pub use guests::{GuestRepository, GuestStream};
pub use normalize::normalize;
pub use storage::{default_data_dir, Storage, StorageError};
