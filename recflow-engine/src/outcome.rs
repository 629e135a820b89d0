//! Mutation results.
//!
//! On the wire a mutation answers with one of three shapes: the saved record
//! (an object), a list of field errors (an array) or a status code (a
//! number, `0` for not found and negative for conflicts). [`RawResult`]
//! captures that untagged union; [`ResultInterpreter`] turns it into the
//! tagged [`Outcome`] the rest of the engine works with.

use crate::error::{EngineError, EngineResult};
use recflow_types::{FieldError, Record};
use serde::{Deserialize, Serialize};

/// Result code for a record that no longer exists.
pub const NOT_FOUND: i64 = 0;

/// Result code for a generic version conflict.
pub const VERSION_CONFLICT: i64 = -1;

/// Result code for an approval or rejection already decided by another approver.
pub const APPROVER_CONFLICT: i64 = -2;

/// A mutation response as the record service sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResult {
    Errors(Vec<FieldError>),
    Code(i64),
    Record(Record),
}

impl RawResult {
    /// Parses a mutation response body.
    pub fn from_json(body: &str) -> EngineResult<Self> {
        serde_json::from_str::<RawResult>(body)?.validated()
    }

    /// Rejects a field-error list with no entries; it would fail the save
    /// without telling the user what to fix.
    pub fn validated(self) -> EngineResult<Self> {
        match self {
            RawResult::Errors(errors) if errors.is_empty() => Err(EngineError::UnexpectedResult(
                "validation failed without field errors".into(),
            )),
            other => Ok(other),
        }
    }
}

/// Kind of concurrent-modification conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The record changed since it was loaded.
    Version(i64),
    /// A privileged actor already approved or rejected the record.
    Approver,
}

impl Conflict {
    /// Maps a negative result code to its conflict kind.
    pub fn from_code(code: i64) -> Self {
        if code == APPROVER_CONFLICT {
            Conflict::Approver
        } else {
            Conflict::Version(code)
        }
    }

    /// The wire code of this conflict.
    pub fn code(self) -> i64 {
        match self {
            Conflict::Version(code) => code,
            Conflict::Approver => APPROVER_CONFLICT,
        }
    }
}

/// Classified result of a mutation.
///
/// Every variant is terminal for the current attempt; nothing is retried.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The service accepted the change.
    Success(T),
    /// Field-level validation failed; the user may fix and retry.
    ValidationFailed(Vec<FieldError>),
    /// The record no longer exists.
    NotFound,
    /// Somebody else changed the record first.
    Conflict(Conflict),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Maps the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::ValidationFailed(errors) => Outcome::ValidationFailed(errors),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Conflict(conflict) => Outcome::Conflict(conflict),
        }
    }
}

/// Classifies raw mutation responses.
pub struct ResultInterpreter;

impl ResultInterpreter {
    /// Classifies a record mutation response.
    ///
    /// A positive code is an acknowledgement without a body; the submitted
    /// snapshot then stands in for the server copy.
    pub fn classify(raw: RawResult, submitted: &Record) -> Outcome<Record> {
        match raw {
            RawResult::Errors(errors) => Outcome::ValidationFailed(errors),
            RawResult::Code(code) if code > 0 => Outcome::Success(submitted.clone()),
            RawResult::Code(code) => Self::failure(code),
            RawResult::Record(record) => Outcome::Success(record),
        }
    }

    /// Classifies an approve/reject/delete result code.
    ///
    /// A positive code is the number of affected records.
    pub fn classify_decision(code: i64) -> Outcome<u64> {
        if code > 0 {
            Outcome::Success(code.unsigned_abs())
        } else {
            Self::failure(code)
        }
    }

    fn failure<T>(code: i64) -> Outcome<T> {
        if code == NOT_FOUND {
            Outcome::NotFound
        } else {
            Outcome::Conflict(Conflict::from_code(code))
        }
    }
}
