//! Record lifecycle and synchronization engine for recflow.
//!
//! # Architecture
//!
//! The engine sits between a list/edit UI and a remote record service. It
//! never renders anything and never touches the network directly; the
//! service is a [`RecordService`] trait object.
//!
//! ## Components
//!
//! - **Diff**: minimal field-level difference between two record snapshots
//! - **Outcome**: classification of mutation results (record, field errors or
//!   a numeric code)
//! - **Workflow**: moderation state machine gating save, submit, approve and
//!   reject by status and permission
//! - **Filter / Sort**: canonical search query reconciled with the URL
//! - **Paging**: search and cursor-paged history queries
//! - **Session**: one record under edit, driving all of the above
//! - **View**: one search screen, with stale-response protection
//!
//! ## Save flow
//!
//! 1. The user edits a copy of the loaded record
//! 2. The diff against the baseline decides whether anything is sent
//! 3. The workflow authorizes the operation for the current status
//! 4. The service answers; the answer is classified into an [`Outcome`]
//! 5. On success the returned record becomes the new baseline
//!
//! # Example
//!
//! ```
//! use recflow_engine::{EditSession, EngineConfig, EntityKind};
//! use recflow_types::{Record, RecordId};
//! use serde_json::json;
//!
//! let record = Record::new(RecordId::parse("a-1").unwrap());
//! let mut session = EditSession::open(EntityKind::Category, record, EngineConfig::default());
//! session.set("name", json!("News")).unwrap();
//! assert!(session.has_changes());
//! ```

mod config;
pub mod diff;
mod error;
mod filter;
mod kind;
mod notice;
pub mod outcome;
mod paging;
pub mod service;
mod session;
mod sort;
mod view;
pub mod workflow;

pub use config::{
    EngineConfig, SaveStrategy, DEFAULT_HISTORY_LIMIT, DEFAULT_LIMIT, DEFAULT_PAGE_SIZES,
};
pub use diff::{diff, has_difference, patch_payload};
pub use error::{EngineError, EngineResult};
pub use filter::{
    coerce_limit, encode_query, encode_query_against, Filter, FilterStateManager, FilterValue,
    HistoryMode, LocationHistory, MemoryLocation, QueryParams, Range, Sort, SortDirection,
    UrlUpdate, LIMIT_PARAM, PAGE_PARAM, SORT_PARAM,
};
pub use kind::EntityKind;
pub use notice::{Notice, SearchSummary};
pub use outcome::{Conflict, Outcome, RawResult, ResultInterpreter};
pub use paging::{next_page_token, HistoryPage, HistoryPager, PagedQueryClient, SearchPage};
pub use service::RecordService;
pub use session::{EditSession, SessionMode};
pub use sort::{handle_sort, remove_sort_status, SortChange, SortState};
pub use view::{SearchCompletion, SearchTicket, SearchView};
pub use workflow::{
    Actor, Operation, Permission, PermissionSet, Transition, TransitionTable, WorkflowEngine,
    WorkflowError,
};
