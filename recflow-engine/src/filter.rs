//! Search filter state.
//!
//! A [`Filter`] is the canonical query of a search view: predicate fields,
//! paging controls and an optional sort. The URL query string is its
//! persisted, shareable form. [`FilterStateManager`] reconciles the two:
//!
//! ```text
//! default filter  <  current filter  <  URL query
//! ```
//!
//! Encoding rules:
//! - single values: `key=value`
//! - multi-value sets: `key=a&key=b`
//! - ranges: `key.min=..&key.max=..`
//! - `page` only when greater than 1, `limit` always
//! - `sort=field` ascending, `sort=-field` descending
//! - a bare `key=` clears a key the default filter sets

use crate::config::EngineConfig;
use crate::sort::SortState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Query parameter carrying the page number.
pub const PAGE_PARAM: &str = "page";
/// Query parameter carrying the page size.
pub const LIMIT_PARAM: &str = "limit";
/// Query parameter carrying the sort.
pub const SORT_PARAM: &str = "sort";

const MIN_SUFFIX: &str = ".min";
const MAX_SUFFIX: &str = ".max";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Sort attached to a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// The `sort` query value: `field` or `-field`.
    pub fn to_param(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.clone(),
            SortDirection::Descending => format!("-{}", self.field),
        }
    }

    /// Parses a `sort` query value. A leading `+` is accepted for ascending.
    pub fn parse(param: &str) -> Option<Self> {
        let param = param.trim();
        let (field, direction) = if let Some(rest) = param.strip_prefix('-') {
            (rest, SortDirection::Descending)
        } else if let Some(rest) = param.strip_prefix('+') {
            (rest, SortDirection::Ascending)
        } else {
            (param, SortDirection::Ascending)
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Bounds of a range predicate, kept as raw strings (numbers or dates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl Range {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Value of one predicate field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Multi(BTreeSet<String>),
    Range(Range),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Single(v) => v.is_empty(),
            FilterValue::Multi(set) => set.is_empty(),
            FilterValue::Range(range) => range.is_empty(),
        }
    }
}

/// Canonical search query of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub fields: BTreeMap<String, FilterValue>,
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LIMIT)
    }
}

impl Filter {
    /// An empty filter on page 1.
    pub fn new(limit: u32) -> Self {
        Self {
            fields: BTreeMap::new(),
            page: 1,
            limit,
            sort: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.fields.get(key)
    }

    /// Sets a single-valued predicate; an empty value removes it.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.fields.remove(&key);
        } else {
            self.fields.insert(key, FilterValue::Single(value));
        }
    }

    /// Builder form of [`Self::set_value`].
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_value(key, value);
        self
    }

    /// Replaces a multi-value predicate with the given set.
    pub fn set_values<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let set: BTreeSet<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| !v.is_empty())
            .collect();
        if set.is_empty() {
            self.fields.remove(&key);
        } else {
            self.fields.insert(key, FilterValue::Multi(set));
        }
    }

    /// Builder form of [`Self::set_values`].
    #[must_use]
    pub fn with_values<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_values(key, values);
        self
    }

    /// Adds or removes one member of a multi-value predicate.
    ///
    /// A single value already stored under the key is promoted to a set.
    pub fn toggle_value(&mut self, key: &str, value: &str, checked: bool) {
        let mut set = match self.fields.remove(key) {
            Some(FilterValue::Multi(set)) => set,
            Some(FilterValue::Single(v)) => BTreeSet::from([v]),
            _ => BTreeSet::new(),
        };
        if checked {
            set.insert(value.to_string());
        } else {
            set.remove(value);
        }
        if !set.is_empty() {
            self.fields.insert(key.to_string(), FilterValue::Multi(set));
        }
    }

    /// Sets the bounds of a range predicate; two `None` bounds remove it.
    pub fn set_range(&mut self, key: impl Into<String>, min: Option<String>, max: Option<String>) {
        let key = key.into();
        let range = Range { min, max };
        if range.is_empty() {
            self.fields.remove(&key);
        } else {
            self.fields.insert(key, FilterValue::Range(range));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.fields.remove(key)
    }

    /// Zero-based offset of the first row of the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Decoded URL query: ordered `(key, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Decodes a query string, with or without the leading `?`.
    ///
    /// `+` decodes to a space. Pairs whose key fails to percent-decode are
    /// skipped.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                let key = decode_component(key)?;
                let value = decode_component(value)?;
                (!key.is_empty()).then_some((key, value))
            })
            .collect();
        Self { pairs }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Last value of `key`.
    pub fn last(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Serializes a filter into a query string (without the leading `?`).
pub fn encode_query(filter: &Filter) -> String {
    encode_query_against(filter, &Filter::new(filter.limit))
}

/// Serializes a filter that will be merged back over `default`.
///
/// Keys the default sets but `filter` leaves empty are written as a bare
/// `key=`, and a default sort the filter drops as `sort=`, so merging the
/// query over `default` gives `filter` back.
pub fn encode_query_against(filter: &Filter, default: &Filter) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |key: &str, value: &str| {
        parts.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        ));
    };

    let keys: BTreeSet<&String> = filter.fields.keys().chain(default.fields.keys()).collect();
    for key in keys {
        match filter.fields.get(key.as_str()) {
            Some(value) if !value.is_empty() => match value {
                FilterValue::Single(v) => push(key, v),
                FilterValue::Multi(set) => {
                    for v in set {
                        push(key, v);
                    }
                }
                FilterValue::Range(range) => {
                    if let Some(min) = &range.min {
                        push(&format!("{key}{MIN_SUFFIX}"), min);
                    }
                    if let Some(max) = &range.max {
                        push(&format!("{key}{MAX_SUFFIX}"), max);
                    }
                }
            },
            _ if default.fields.contains_key(key.as_str()) => push(key, ""),
            _ => {}
        }
    }

    if filter.page > 1 {
        push(PAGE_PARAM, &filter.page.to_string());
    }
    push(LIMIT_PARAM, &filter.limit.to_string());
    match (&filter.sort, &default.sort) {
        (Some(sort), _) => push(SORT_PARAM, &sort.to_param()),
        (None, Some(_)) => push(SORT_PARAM, ""),
        (None, None) => {}
    }

    parts.join("&")
}

/// Coerces `limit` to the nearest allowed page size; ties go to the smaller.
///
/// With no allowed sizes the limit is returned unchanged.
pub fn coerce_limit(limit: u32, page_sizes: &[u32]) -> u32 {
    page_sizes
        .iter()
        .copied()
        .min_by_key(|size| (size.abs_diff(limit), *size))
        .unwrap_or(limit)
}

/// Where the serialized filter went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// The current history entry was overwritten (first load).
    Replace,
    /// A new history entry was appended.
    Push,
}

/// Result of [`FilterStateManager::add_parameters_into_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlUpdate {
    pub query: String,
    pub mode: HistoryMode,
}

/// Browser-history-like collaborator holding the URL query.
pub trait LocationHistory {
    /// The query string of the current entry.
    fn current_query(&self) -> String;

    /// Overwrites the current entry.
    fn replace(&mut self, query: &str);

    /// Appends a new entry.
    fn push(&mut self, query: &str);
}

/// In-memory [`LocationHistory`] used by the CLI and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLocation {
    entries: Vec<String>,
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("")
    }
}

impl MemoryLocation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            entries: vec![query.into()],
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocationHistory for MemoryLocation {
    fn current_query(&self) -> String {
        self.entries.last().cloned().unwrap_or_default()
    }

    fn replace(&mut self, query: &str) {
        match self.entries.last_mut() {
            Some(last) => *last = query.to_string(),
            None => self.entries.push(query.to_string()),
        }
    }

    fn push(&mut self, query: &str) {
        self.entries.push(query.to_string());
    }
}

/// Reconciles a view's filter with its URL.
#[derive(Debug, Clone)]
pub struct FilterStateManager {
    page_sizes: Vec<u32>,
    multi_value_keys: Vec<String>,
    default_filter: Filter,
}

impl FilterStateManager {
    /// Creates a manager; the default filter's limit is coerced into the page sizes.
    pub fn new(config: &EngineConfig, multi_value_keys: &[&str], mut default_filter: Filter) -> Self {
        default_filter.limit = coerce_limit(default_filter.limit, &config.page_sizes);
        default_filter.page = default_filter.page.max(1);
        Self {
            page_sizes: config.page_sizes.clone(),
            multi_value_keys: multi_value_keys.iter().map(|k| k.to_string()).collect(),
            default_filter,
        }
    }

    pub fn page_sizes(&self) -> &[u32] {
        &self.page_sizes
    }

    pub fn multi_value_keys(&self) -> &[String] {
        &self.multi_value_keys
    }

    pub fn default_filter(&self) -> &Filter {
        &self.default_filter
    }

    /// Layers the URL query over `current`.
    ///
    /// - `limit` outside `page_sizes` is coerced to the nearest size.
    /// - keys in `multi_value_keys` accumulate repeated parameters into a set;
    ///   other repeated keys keep the last value.
    /// - `page` is 1 when the URL omits it or carries a non-positive or
    ///   unparsable value.
    /// - a key with an empty value is removed; later values for the same key
    ///   start a fresh value.
    ///
    /// An empty query returns `current` normalized.
    pub fn merge_filter(
        url: &QueryParams,
        current: &Filter,
        page_sizes: &[u32],
        multi_value_keys: &[&str],
    ) -> Filter {
        let mut merged = current.clone();
        merged.limit = coerce_limit(merged.limit, page_sizes);
        merged.page = merged.page.max(1);
        if url.is_empty() {
            return merged;
        }

        let mut multi: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut ranges: BTreeMap<String, Range> = BTreeMap::new();
        let mut page = 1;

        for (key, value) in url.pairs() {
            match key.as_str() {
                PAGE_PARAM => {
                    page = value.trim().parse::<u32>().ok().filter(|p| *p > 0).unwrap_or(1);
                }
                LIMIT_PARAM => {
                    if let Ok(limit) = value.trim().parse::<u32>() {
                        merged.limit = coerce_limit(limit, page_sizes);
                    } else {
                        debug!("Ignoring unparsable limit {:?}", value);
                    }
                }
                SORT_PARAM => merged.sort = Sort::parse(value),
                _ if value.is_empty() => {
                    multi.remove(key);
                    ranges.remove(key);
                    merged.fields.remove(key);
                }
                _ if multi_value_keys.contains(&key.as_str()) => {
                    multi.entry(key.clone()).or_default().insert(value.clone());
                }
                _ => {
                    if let Some(base) = key.strip_suffix(MIN_SUFFIX) {
                        ranges.entry(base.to_string()).or_default().min = Some(value.clone());
                    } else if let Some(base) = key.strip_suffix(MAX_SUFFIX) {
                        ranges.entry(base.to_string()).or_default().max = Some(value.clone());
                    } else {
                        merged
                            .fields
                            .insert(key.clone(), FilterValue::Single(value.clone()));
                    }
                }
            }
        }

        for (key, set) in multi {
            merged.fields.insert(key, FilterValue::Multi(set));
        }
        for (key, range) in ranges {
            merged.fields.insert(key, FilterValue::Range(range));
        }
        merged.page = page;
        merged
    }

    /// Builds the initial filter of a view from its URL query.
    pub fn init_filter(&self, url_query: &str) -> Filter {
        let keys: Vec<&str> = self.multi_value_keys.iter().map(String::as_str).collect();
        Self::merge_filter(
            &QueryParams::parse(url_query),
            &self.default_filter,
            &self.page_sizes,
            &keys,
        )
    }

    /// Merges a URL query over an existing filter with this manager's settings.
    pub fn merge(&self, url_query: &str, current: &Filter) -> Filter {
        let keys: Vec<&str> = self.multi_value_keys.iter().map(String::as_str).collect();
        Self::merge_filter(&QueryParams::parse(url_query), current, &self.page_sizes, &keys)
    }

    /// Attaches the active sort of `state` to the filter, or removes the sort.
    pub fn build_sort_filter(filter: &Filter, state: &SortState) -> Filter {
        let mut built = filter.clone();
        built.sort = state.to_sort();
        built
    }

    /// Serializes `filter` so that [`Self::init_filter`] restores it.
    pub fn encode(&self, filter: &Filter) -> String {
        encode_query_against(filter, &self.default_filter)
    }

    /// Writes the filter into the location: replace on first load, push otherwise.
    pub fn add_parameters_into_url<L: LocationHistory + ?Sized>(
        &self,
        filter: &Filter,
        is_first_load: bool,
        location: &mut L,
    ) -> UrlUpdate {
        let query = self.encode(filter);
        let mode = if is_first_load {
            location.replace(&query);
            HistoryMode::Replace
        } else {
            location.push(&query);
            HistoryMode::Push
        };
        debug!("URL updated ({:?}): {}", mode, query);
        UrlUpdate { query, mode }
    }
}
