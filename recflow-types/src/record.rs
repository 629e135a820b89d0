use crate::{Error, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Name of the identifier field every record carries.
pub const ID_FIELD: &str = "id";

/// Name of the lifecycle discriminator field.
pub const STATUS_FIELD: &str = "status";

/// A record managed by the engine.
///
/// The payload is an arbitrary JSON object. The only structural guarantee is
/// that `id` is present and is a non-blank string; every other field is
/// opaque. Records are snapshots: the `with_*` methods return a new record and
/// leave the receiver untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a record holding only its id.
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
        Self { fields }
    }

    /// Builds a record from a JSON value, validating that it is an object with an id.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(Error::NotAnObject),
        }
    }

    /// Builds a record from a JSON object, validating the id.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self, Error> {
        match fields.get(ID_FIELD) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(Self { fields }),
            Some(Value::String(s)) => Err(Error::InvalidId(s.clone())),
            Some(other) => Err(Error::InvalidId(other.to_string())),
            None => Err(Error::MissingId),
        }
    }

    /// The record id.
    pub fn id(&self) -> &str {
        self.fields
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The record id as a typed identifier.
    pub fn record_id(&self) -> RecordId {
        RecordId::from_validated(self.id().to_string())
    }

    /// The lifecycle status, if present and recognised.
    pub fn status(&self) -> Option<RecordStatus> {
        self.fields
            .get(STATUS_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Returns a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Resolves a JSON pointer (e.g. `/publishedAt` or `/author/name`).
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let rest = pointer.strip_prefix('/')?;
        let (head, tail) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let value = self.fields.get(head)?;
        if tail.is_empty() {
            Some(value)
        } else {
            value.pointer(tail)
        }
    }

    /// Extract a string value using a JSON pointer (e.g., "/title").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a boolean value using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.pointer(pointer).and_then(|v| v.as_bool())
    }

    /// Extract a numeric value using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.pointer(pointer).and_then(|v| v.as_f64())
    }

    /// All fields, including `id`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a copy of this record with `key` set to `value`.
    ///
    /// The id is immutable; attempting to change it is an error.
    pub fn with_field(&self, key: &str, value: Value) -> Result<Self, Error> {
        if key == ID_FIELD {
            return Err(Error::ImmutableField(key.to_string()));
        }
        let mut fields = self.fields.clone();
        fields.insert(key.to_string(), value);
        Ok(Self { fields })
    }

    /// Returns a copy of this record without `key`.
    pub fn without_field(&self, key: &str) -> Result<Self, Error> {
        if key == ID_FIELD {
            return Err(Error::ImmutableField(key.to_string()));
        }
        let mut fields = self.fields.clone();
        fields.remove(key);
        Ok(Self { fields })
    }

    /// Returns a copy of this record with its status replaced.
    #[must_use]
    pub fn with_status(&self, status: RecordStatus) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(
            STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );
        Self { fields }
    }

    /// Converts the record into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Clones the record into a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.fields
    }
}

/// Lifecycle state of a record.
///
/// Moderated entities move through the workflow states; simple entities only
/// toggle between `Active` and `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "submitted")]
    Submitted,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "published")]
    Published,
    #[serde(rename = "request_to_edit")]
    RequestToEdit,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "A")]
    Active,
    #[serde(rename = "I")]
    Inactive,
}

impl RecordStatus {
    /// Every status, in declaration order.
    pub const ALL: [RecordStatus; 9] = [
        RecordStatus::Draft,
        RecordStatus::Submitted,
        RecordStatus::Rejected,
        RecordStatus::Approved,
        RecordStatus::Published,
        RecordStatus::RequestToEdit,
        RecordStatus::Expired,
        RecordStatus::Active,
        RecordStatus::Inactive,
    ];

    /// Wire code of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Submitted => "submitted",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Approved => "approved",
            RecordStatus::Published => "published",
            RecordStatus::RequestToEdit => "request_to_edit",
            RecordStatus::Expired => "expired",
            RecordStatus::Active => "A",
            RecordStatus::Inactive => "I",
        }
    }

    /// Whether the status belongs to the moderation workflow.
    pub const fn is_workflow(self) -> bool {
        !matches!(self, RecordStatus::Active | RecordStatus::Inactive)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::UnknownStatus(s.to_string()))
    }
}

/// One field-level validation error returned by the record service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field the error applies to.
    pub field: String,
    /// Machine-readable error code (e.g. `required`, `maxlength`).
    pub code: String,
    /// Optional parameter of the rule that failed (e.g. the max length).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Optional server-rendered message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldError {
    /// Creates a field error without parameter or message.
    pub fn new(field: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            param: None,
            message: None,
        }
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
