//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Page sizes offered by every search view.
pub const DEFAULT_PAGE_SIZES: [u32; 8] = [12, 24, 60, 100, 120, 180, 300, 600];

/// Page size used when neither the URL nor the view asks for one.
pub const DEFAULT_LIMIT: u32 = 24;

/// Entries fetched per "load more" click in history views.
pub const DEFAULT_HISTORY_LIMIT: u32 = 3;

/// How an edited record is sent back to the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    /// PATCH with only the changed fields (plus the id).
    #[default]
    Patch,
    /// PUT with the full record.
    Update,
}

/// Configuration shared by search views and edit sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allowed page sizes; a requested limit outside this set is coerced.
    pub page_sizes: Vec<u32>,
    /// Limit of a freshly opened search view.
    pub default_limit: u32,
    /// Page size for history views.
    pub history_limit: u32,
    /// Keys never included in a diff.
    pub immutable_keys: Vec<String>,
    /// Save strategy for existing records.
    pub save_strategy: SaveStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
            default_limit: DEFAULT_LIMIT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            immutable_keys: vec![recflow_types::ID_FIELD.to_string()],
            save_strategy: SaveStrategy::Patch,
        }
    }
}

impl EngineConfig {
    /// Checks the invariants the filter state machine relies on.
    pub fn validate(&self) -> EngineResult<()> {
        if self.page_sizes.is_empty() {
            return Err(EngineError::Config("page_sizes must not be empty".into()));
        }
        if self.page_sizes.contains(&0) {
            return Err(EngineError::Config("page sizes must be positive".into()));
        }
        if !self.page_sizes.contains(&self.default_limit) {
            return Err(EngineError::Config(format!(
                "default_limit {} is not one of the page sizes {:?}",
                self.default_limit, self.page_sizes
            )));
        }
        if self.history_limit == 0 {
            return Err(EngineError::Config("history_limit must be positive".into()));
        }
        Ok(())
    }

    /// Immutable keys as string slices, for [`crate::diff::diff`].
    pub fn immutable_key_refs(&self) -> Vec<&str> {
        self.immutable_keys.iter().map(String::as_str).collect()
    }
}
