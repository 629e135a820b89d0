//! List and history query results.

use crate::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a search.
///
/// `total` is the server-side count of all matching records, independent of
/// how many are in `list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T = Record> {
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> SearchResult<T> {
    /// Creates a result page.
    pub fn new(list: Vec<T>, total: u64) -> Self {
        Self { list, total }
    }

    /// An empty result.
    pub fn empty() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
        }
    }

    /// Whether the page holds no records.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<T> Default for SearchResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// An immutable snapshot of a record taken when an action was applied to it.
///
/// History is returned newest first and paged by cursor: the cursor for the
/// next page is the `id` of the last entry of a full page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Id of the history entry (not of the record).
    pub id: String,
    /// User who performed the action.
    pub author: String,
    /// When the action happened.
    pub time: DateTime<Utc>,
    /// Action name (`create`, `update`, `approve`, ...).
    pub action: String,
    /// Record state after the action. Absent for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
}
