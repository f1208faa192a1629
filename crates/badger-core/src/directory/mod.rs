//! Path-addressed directory client.
//!
//! The [`Directory`] trait is the seam between domain code and the realtime
//! database that actually stores guests. It exposes generic CRUD, single
//! reads, a conditional write, and live subscriptions over a hierarchical
//! JSON tree addressed by `/`-separated paths.
//!
//! Subscriptions are lazy, unbounded streams of whole snapshots:
//!
//! - the current value is emitted as soon as the stream is polled
//! - one element follows per change; consecutive duplicates are suppressed
//! - bursts may be coalesced so a slow consumer only sees the latest value
//! - a stream ends when it is dropped, or right after yielding an error
//!
//! [`MemoryDirectory`] is the in-process realtime backend.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use thiserror::Error;

mod memory;
mod path;
mod query;
mod stream;

pub use memory::MemoryDirectory;
pub use path::{is_valid_key, DirectoryPath};
pub use query::{compare_values, ListQuery, HIGH_SENTINEL};

/// Errors reported by a directory backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The path contains a segment that is not a valid key.
    #[error("Invalid directory path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The backend cannot be reached.
    #[error("Directory backend unavailable: {message}")]
    Unavailable {
        /// Connectivity failure description.
        message: String,
    },

    /// The backend refused the write.
    #[error("Write rejected at '{path}': {message}")]
    Rejected {
        /// Target path of the write.
        path: String,
        /// Rejection reason.
        message: String,
    },

    /// The write could not be made durable.
    #[error("Failed to persist directory: {message}")]
    Persistence {
        /// Underlying storage failure.
        message: String,
    },

    /// Backend state is unusable.
    #[error("Directory internal error: {message}")]
    Internal {
        /// Failure description.
        message: String,
    },
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A keyed child of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    /// Child key (last path segment).
    pub key: String,
    /// Child value.
    pub value: Value,
}

/// Precondition checked by [`Directory::compare_and_patch`].
///
/// Every guard requires the node to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The node exists.
    Exists,
    /// `field` is present and equal to `value`.
    FieldEquals {
        /// Child key to compare.
        field: String,
        /// Required value.
        value: Value,
    },
    /// `field` is equal to `value`, or is absent.
    FieldEqualsOrAbsent {
        /// Child key to compare.
        field: String,
        /// Required value when the field is present.
        value: Value,
    },
}

impl Guard {
    /// Whether the guard holds for `node` (`None` when the node is missing).
    #[must_use]
    pub fn holds(&self, node: Option<&Value>) -> bool {
        let Some(node) = node else {
            return false;
        };
        match self {
            Self::Exists => true,
            Self::FieldEquals { field, value } => node.get(field) == Some(value),
            Self::FieldEqualsOrAbsent { field, value } => {
                node.get(field).map_or(true, |current| current == value)
            }
        }
    }
}

/// Outcome of [`Directory::compare_and_patch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The guard held and the fields were written.
    Applied,
    /// The guard did not hold; nothing was written.
    Rejected {
        /// The node as it was when the guard was evaluated.
        current: Option<Value>,
    },
}

/// Stream of snapshots of a single node.
pub type ValueStream = BoxStream<'static, DirectoryResult<Option<Value>>>;

/// Stream of ordered child-list snapshots.
pub type ListStream = BoxStream<'static, DirectoryResult<Vec<Child>>>;

/// Path-addressed hierarchical store with live subscriptions.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Write `value` under a new backend-assigned child key of `path` and
    /// return that key.
    async fn create(&self, path: &str, value: Value) -> DirectoryResult<String>;

    /// Overwrite the node at `path`. Writing `null` removes it.
    async fn replace(&self, path: &str, value: Value) -> DirectoryResult<()>;

    /// Overwrite individual fields below `path`. Field names may be relative
    /// sub-paths; a `null` field removes that child.
    async fn patch(&self, path: &str, fields: Map<String, Value>) -> DirectoryResult<()>;

    /// Delete the node at `path`.
    async fn remove(&self, path: &str) -> DirectoryResult<()>;

    /// Read the node at `path` once.
    async fn get_once(&self, path: &str) -> DirectoryResult<Option<Value>>;

    /// Read the children of `path` once, filtered and ordered by `query`.
    async fn get_once_list(&self, path: &str, query: &ListQuery) -> DirectoryResult<Vec<Child>>;

    /// Apply `fields` only if `guard` holds for the node at `path`,
    /// atomically with respect to other writes.
    async fn compare_and_patch(
        &self,
        path: &str,
        guard: &Guard,
        fields: Map<String, Value>,
    ) -> DirectoryResult<WriteOutcome>;

    /// Subscribe to the node at `path`.
    fn observe_one(&self, path: &str) -> ValueStream;

    /// Subscribe to the children of `path` selected by `query`.
    fn observe_query(&self, path: &str, query: ListQuery) -> ListStream;

    /// Subscribe to every child of `path`, ordered by `order_key`.
    fn observe_list(&self, path: &str, order_key: Option<&str>) -> ListStream {
        self.observe_query(path, ListQuery::ordered_by(order_key))
    }

    /// Subscribe to the children of `path` whose `order_key` starts with `prefix`.
    fn observe_search(
        &self,
        path: &str,
        order_key: &str,
        prefix: &str,
        limit: Option<usize>,
    ) -> ListStream {
        self.observe_query(path, ListQuery::prefix(order_key, prefix, limit))
    }

    /// Whether the backend currently has connectivity.
    fn is_online(&self) -> bool {
        true
    }
}
