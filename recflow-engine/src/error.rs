//! Error types for the engine.

use crate::workflow::WorkflowError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that escape the engine.
///
/// Status-driven outcomes (validation failure, not found, conflicts) are not
/// errors; they are reported through [`crate::Outcome`] and
/// [`crate::Notice`]. Everything here is propagated to the caller's global
/// handler unmodified.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport failure or an HTTP status the engine does not interpret.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service refused the caller (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A workflow guard rejected the operation before any call was made.
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// The entity kind only supports search and load.
    #[error("{0} records are read-only")]
    ReadOnly(String),

    /// The edit session cannot perform the requested operation.
    #[error("invalid session state: {0}")]
    SessionState(String),

    /// Record payload violated a structural invariant.
    #[error("record error: {0}")]
    Record(#[from] recflow_types::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A filter could not be built or decoded.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The service answered with a value outside the result protocol.
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Returns true for 401/403 responses.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, EngineError::Unauthorized(_))
    }

    /// Returns true for failures that belong to the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EngineError::Transport(_) | EngineError::UnexpectedResult(_)
        )
    }
}
