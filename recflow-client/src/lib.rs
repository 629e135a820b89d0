//! HTTP client for recflow record services.
//!
//! Provides [`HttpRecordService`], the reqwest-backed implementation of the
//! engine's [`recflow_engine::RecordService`] trait, the TOML-backed
//! [`ClientConfig`] and the [`AppContext`] registry that wires one service
//! per entity kind.
//!
//! # Status mapping
//!
//! | Status    | Mutations          | Approve / reject / delete | Load   |
//! |-----------|--------------------|---------------------------|--------|
//! | 2xx       | body (empty → `1`) | body (empty → `1`)        | record |
//! | 404, 410  | `0`                | `0`                       | `None` |
//! | 409       | `-1` (create: `0`) | server code               | error  |
//! | 422       | field errors       | error                     | error  |
//! | 401, 403  | `Unauthorized`     | `Unauthorized`            | `Unauthorized` |
//!
//! Any other status is a transport error. A mutation body holding an empty
//! field-error list is an unexpected result.

mod config;
mod context;
mod error;
mod http;

pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use context::AppContext;
pub use error::{ClientError, ClientResult};
pub use http::{HttpRecordService, FIELDS_PARAM, HISTORY_CURSOR_PARAM};
