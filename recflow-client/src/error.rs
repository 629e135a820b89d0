//! Client error types.

use recflow_engine::EngineError;
use thiserror::Error;

/// Result type for client setup and configuration.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while building or configuring the HTTP client.
///
/// Per-request failures are reported through [`EngineError`], since the
/// client implements the engine's service trait.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
