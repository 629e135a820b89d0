//! Client configuration, loaded from TOML.
//!
//! ```toml
//! base_url = "http://localhost:8083"
//! timeout_secs = 30
//!
//! [paths]
//! audit_log = "audit-logs"
//!
//! [engine]
//! default_limit = 24
//! save_strategy = "patch"
//! ```

use crate::error::{ClientError, ClientResult};
use recflow_engine::{EngineConfig, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default record service base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8083";

/// Default transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings and engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every service path is appended to.
    pub base_url: String,
    /// Transport timeout per request.
    pub timeout_secs: u64,
    /// Path overrides keyed by entity kind (`article`, `audit_log`, ...).
    pub paths: BTreeMap<String, String>,
    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub engine: EngineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            paths: BTreeMap::new(),
            auth_token: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        debug!("Loading client config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks the URL, timeout, path overrides and engine settings.
    pub fn validate(&self) -> ClientResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be positive".into()));
        }
        for key in self.paths.keys() {
            key.parse::<EntityKind>().map_err(ClientError::Config)?;
        }
        self.engine.validate()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Path of an entity kind, honouring overrides.
    pub fn path_for(&self, kind: EntityKind) -> &str {
        self.paths
            .iter()
            .find(|(key, _)| key.parse::<EntityKind>() == Ok(kind))
            .map(|(_, path)| path.as_str())
            .unwrap_or(kind.path())
    }

    /// Full service URL of an entity kind, without a trailing slash.
    pub fn url_for(&self, kind: EntityKind) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path_for(kind).trim_matches('/')
        )
    }
}
