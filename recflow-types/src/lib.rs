//! Core type definitions for recflow.
//!
//! This crate defines the structural types every other recflow crate depends on:
//! - [`Record`]: an opaque JSON object that always carries an `id` and usually a `status`
//! - [`RecordId`]: the immutable string identifier of a record
//! - [`RecordStatus`]: the closed set of lifecycle states (workflow and active/inactive)
//! - [`SearchResult`] and [`HistoryEntry`]: what the record service returns for
//!   list and history queries
//! - [`FieldError`]: one element of a validation failure
//!
//! Entity-specific fields (titles, descriptions, tags, ...) are never modelled
//! here. The engine works on records structurally.

mod ids;
mod record;
mod search;

pub use ids::RecordId;
pub use record::{FieldError, Record, RecordStatus, ID_FIELD, STATUS_FIELD};
pub use search::{HistoryEntry, SearchResult};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no `id` field")]
    MissingId,

    #[error("invalid record id: {0:?}")]
    InvalidId(String),

    #[error("field `{0}` is immutable")]
    ImmutableField(String),

    #[error("unknown record status: {0:?}")]
    UnknownStatus(String),
}
