//! Record service abstraction.
//!
//! The engine never talks to the network itself. Each entity kind is backed
//! by a [`RecordService`]; the HTTP implementation lives in `recflow-client`.

use crate::error::EngineResult;
use crate::filter::Filter;
use crate::outcome::RawResult;
use async_trait::async_trait;
use recflow_types::{HistoryEntry, Record, SearchResult};
use serde_json::{Map, Value};

/// Remote store of one entity kind.
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Searches with the filter's predicates and sort.
    ///
    /// `fields`, when non-empty, restricts the returned columns.
    async fn search(
        &self,
        filter: &Filter,
        limit: u32,
        page: u32,
        fields: &[String],
    ) -> EngineResult<SearchResult>;

    /// Loads one record; `None` when it does not exist.
    async fn load(&self, id: &str) -> EngineResult<Option<Record>>;

    /// Creates a record. A duplicate id answers `0`.
    async fn create(&self, record: &Record) -> EngineResult<RawResult>;

    /// Replaces a record.
    async fn update(&self, record: &Record) -> EngineResult<RawResult>;

    /// Applies a partial update; `partial` carries the id plus changed fields.
    async fn patch(&self, id: &str, partial: &Map<String, Value>) -> EngineResult<RawResult>;

    /// Approves a submitted record.
    async fn approve(&self, id: &str) -> EngineResult<i64>;

    /// Rejects a submitted record.
    async fn reject(&self, id: &str) -> EngineResult<i64>;

    /// Deletes a record.
    async fn delete(&self, id: &str) -> EngineResult<i64>;

    /// History entries, newest first, starting after `next_page_token`.
    async fn get_histories(
        &self,
        id: &str,
        limit: u32,
        next_page_token: Option<&str>,
    ) -> EngineResult<Vec<HistoryEntry>>;
}

/// In-memory record service for tests and offline use.
pub mod mock {
    use super::*;
    use crate::error::EngineError;
    use crate::filter::{FilterValue, SortDirection};
    use crate::outcome::{APPROVER_CONFLICT, NOT_FOUND, VERSION_CONFLICT};
    use recflow_types::{ID_FIELD, RecordStatus};
    use std::cmp::Ordering;
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// A call received by the mock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Search { page: u32, limit: u32 },
        Load(String),
        Create(String),
        Update(String),
        Patch { id: String, fields: Vec<String> },
        Approve(String),
        Reject(String),
        Delete(String),
        Histories { id: String, token: Option<String> },
    }

    /// Injected failure for every subsequent call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockFailure {
        Transport,
        Unauthorized,
    }

    #[derive(Default)]
    struct State {
        records: BTreeMap<String, Record>,
        histories: HashMap<String, Vec<HistoryEntry>>,
        raw_script: VecDeque<RawResult>,
        code_script: VecDeque<i64>,
        calls: Vec<Call>,
        failure: Option<MockFailure>,
    }

    /// Record service backed by a map.
    ///
    /// Mutations follow the store unless a response was scripted with
    /// [`MockRecordService::script_raw`] or [`MockRecordService::script_code`].
    #[derive(Default)]
    pub struct MockRecordService {
        state: Mutex<State>,
    }

    impl MockRecordService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a service holding `records`.
        pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
            let service = Self::new();
            for record in records {
                service.insert(record);
            }
            service
        }

        fn lock(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Stores a record, replacing any with the same id.
        pub fn insert(&self, record: Record) {
            self.lock().records.insert(record.id().to_string(), record);
        }

        /// The stored copy of a record.
        pub fn get(&self, id: &str) -> Option<Record> {
            self.lock().records.get(id).cloned()
        }

        pub fn len(&self) -> usize {
            self.lock().records.len()
        }

        pub fn is_empty(&self) -> bool {
            self.lock().records.is_empty()
        }

        /// Sets the history of a record; entries are kept newest first.
        pub fn set_history(&self, id: &str, mut entries: Vec<HistoryEntry>) {
            entries.sort_by(|a, b| b.time.cmp(&a.time));
            self.lock().histories.insert(id.to_string(), entries);
        }

        /// Queues the answer of the next create/update/patch.
        pub fn script_raw(&self, raw: RawResult) {
            self.lock().raw_script.push_back(raw);
        }

        /// Queues the answer of the next approve/reject/delete.
        pub fn script_code(&self, code: i64) {
            self.lock().code_script.push_back(code);
        }

        /// Makes every subsequent call fail, or clears the failure.
        pub fn set_failure(&self, failure: Option<MockFailure>) {
            self.lock().failure = failure;
        }

        /// Calls received so far.
        pub fn calls(&self) -> Vec<Call> {
            self.lock().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.lock().calls.len()
        }

        fn begin(&self, call: Call) -> EngineResult<MutexGuard<'_, State>> {
            let mut state = self.lock();
            state.calls.push(call);
            let failure = state.failure;
            match failure {
                Some(MockFailure::Transport) => {
                    Err(EngineError::Transport("connection refused".into()))
                }
                Some(MockFailure::Unauthorized) => {
                    Err(EngineError::Unauthorized("401 Unauthorized".into()))
                }
                None => Ok(state),
            }
        }
    }

    fn matches_filter(record: &Record, filter: &Filter) -> bool {
        filter.fields.iter().all(|(key, value)| {
            let field = record.get(key).map(value_text);
            match value {
                FilterValue::Single(expected) if key == "q" => record
                    .fields()
                    .values()
                    .filter_map(Value::as_str)
                    .any(|s| s.to_lowercase().contains(&expected.to_lowercase())),
                FilterValue::Single(expected) => field.as_deref() == Some(expected.as_str()),
                FilterValue::Multi(set) => field.is_some_and(|f| set.contains(&f)),
                FilterValue::Range(range) => match field {
                    Some(f) => {
                        range.min.as_ref().is_none_or(|min| compare(&f, min) != Ordering::Less)
                            && range
                                .max
                                .as_ref()
                                .is_none_or(|max| compare(&f, max) != Ordering::Greater)
                    }
                    None => false,
                },
            }
        })
    }

    fn value_text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn compare(a: &str, b: &str) -> Ordering {
        match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.cmp(b),
        }
    }

    fn project(record: &Record, fields: &[String]) -> Record {
        if fields.is_empty() {
            return record.clone();
        }
        let mut map = Map::new();
        for (key, value) in record.fields() {
            if key == ID_FIELD || fields.iter().any(|f| f == key) {
                map.insert(key.clone(), value.clone());
            }
        }
        Record::from_map(map).unwrap_or_else(|_| record.clone())
    }

    #[async_trait]
    impl RecordService for MockRecordService {
        async fn search(
            &self,
            filter: &Filter,
            limit: u32,
            page: u32,
            fields: &[String],
        ) -> EngineResult<SearchResult> {
            let state = self.begin(Call::Search { page, limit })?;
            let mut found: Vec<&Record> = state
                .records
                .values()
                .filter(|r| matches_filter(r, filter))
                .collect();

            if let Some(sort) = &filter.sort {
                found.sort_by(|a, b| {
                    let x = a.get(&sort.field).map(value_text).unwrap_or_default();
                    let y = b.get(&sort.field).map(value_text).unwrap_or_default();
                    let ord = compare(&x, &y);
                    match sort.direction {
                        SortDirection::Ascending => ord,
                        SortDirection::Descending => ord.reverse(),
                    }
                });
            }

            let total = found.len() as u64;
            let offset = (page.max(1) as usize - 1) * limit as usize;
            let list = found
                .into_iter()
                .skip(offset)
                .take(limit as usize)
                .map(|r| project(r, fields))
                .collect();
            Ok(SearchResult::new(list, total))
        }

        async fn load(&self, id: &str) -> EngineResult<Option<Record>> {
            let state = self.begin(Call::Load(id.to_string()))?;
            Ok(state.records.get(id).cloned())
        }

        async fn create(&self, record: &Record) -> EngineResult<RawResult> {
            let mut state = self.begin(Call::Create(record.id().to_string()))?;
            if let Some(raw) = state.raw_script.pop_front() {
                return Ok(raw);
            }
            if state.records.contains_key(record.id()) {
                return Ok(RawResult::Code(NOT_FOUND));
            }
            state
                .records
                .insert(record.id().to_string(), record.clone());
            Ok(RawResult::Record(record.clone()))
        }

        async fn update(&self, record: &Record) -> EngineResult<RawResult> {
            let mut state = self.begin(Call::Update(record.id().to_string()))?;
            if let Some(raw) = state.raw_script.pop_front() {
                return Ok(raw);
            }
            if !state.records.contains_key(record.id()) {
                return Ok(RawResult::Code(NOT_FOUND));
            }
            state
                .records
                .insert(record.id().to_string(), record.clone());
            Ok(RawResult::Record(record.clone()))
        }

        async fn patch(&self, id: &str, partial: &Map<String, Value>) -> EngineResult<RawResult> {
            let mut fields: Vec<String> = partial.keys().cloned().collect();
            fields.sort();
            let mut state = self.begin(Call::Patch {
                id: id.to_string(),
                fields,
            })?;
            if let Some(raw) = state.raw_script.pop_front() {
                return Ok(raw);
            }
            let Some(stored) = state.records.get(id) else {
                return Ok(RawResult::Code(NOT_FOUND));
            };
            let mut fields = stored.fields().clone();
            for (key, value) in partial {
                if value.is_null() {
                    fields.remove(key);
                } else {
                    fields.insert(key.clone(), value.clone());
                }
            }
            let patched = Record::from_map(fields)?;
            state.records.insert(id.to_string(), patched.clone());
            Ok(RawResult::Record(patched))
        }

        async fn approve(&self, id: &str) -> EngineResult<i64> {
            let mut state = self.begin(Call::Approve(id.to_string()))?;
            Ok(decide(&mut state, id, RecordStatus::Approved))
        }

        async fn reject(&self, id: &str) -> EngineResult<i64> {
            let mut state = self.begin(Call::Reject(id.to_string()))?;
            Ok(decide(&mut state, id, RecordStatus::Rejected))
        }

        async fn delete(&self, id: &str) -> EngineResult<i64> {
            let mut state = self.begin(Call::Delete(id.to_string()))?;
            if let Some(code) = state.code_script.pop_front() {
                return Ok(code);
            }
            Ok(match state.records.remove(id) {
                Some(_) => 1,
                None => NOT_FOUND,
            })
        }

        async fn get_histories(
            &self,
            id: &str,
            limit: u32,
            next_page_token: Option<&str>,
        ) -> EngineResult<Vec<HistoryEntry>> {
            let state = self.begin(Call::Histories {
                id: id.to_string(),
                token: next_page_token.map(str::to_string),
            })?;
            let Some(entries) = state.histories.get(id) else {
                return Ok(Vec::new());
            };
            let start = match next_page_token {
                Some(token) => entries
                    .iter()
                    .position(|e| e.id == token)
                    .map_or(entries.len(), |i| i + 1),
                None => 0,
            };
            Ok(entries
                .iter()
                .skip(start)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn decide(state: &mut State, id: &str, to: RecordStatus) -> i64 {
        if let Some(code) = state.code_script.pop_front() {
            return code;
        }
        let Some(stored) = state.records.get(id) else {
            return NOT_FOUND;
        };
        match stored.status() {
            Some(RecordStatus::Submitted) => {
                let decided = stored.with_status(to);
                state.records.insert(id.to_string(), decided);
                1
            }
            Some(RecordStatus::Approved | RecordStatus::Rejected) => APPROVER_CONFLICT,
            _ => VERSION_CONFLICT,
        }
    }
}
