//! Search view state machine.
//!
//! A [`SearchView`] owns the filter, sort state and current result page of
//! one list screen. UI events mutate the filter; a search is split into
//! [`SearchView::begin_search`], which records the filter in the URL and
//! hands out a numbered [`SearchTicket`], and [`SearchView::complete_search`],
//! which applies the response only if no newer search was started since.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::filter::{coerce_limit, Filter, FilterStateManager, LocationHistory, UrlUpdate};
use crate::kind::EntityKind;
use crate::notice::SearchSummary;
use crate::paging::{PagedQueryClient, SearchPage};
use crate::sort::{handle_sort, remove_sort_status, SortChange, SortState};
use recflow_types::Record;
use tracing::debug;

/// A search in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub filter: Filter,
    pub limit: u32,
    pub page: u32,
    pub url: UrlUpdate,
}

/// What happened to a completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCompletion {
    /// The response is now the view's result.
    Applied,
    /// A newer search was started; the response was dropped.
    Stale,
}

/// State of one search screen.
pub struct SearchView<L: LocationHistory> {
    kind: EntityKind,
    manager: FilterStateManager,
    location: L,
    filter: Filter,
    sort: SortState,
    fields: Vec<String>,
    list: Vec<Record>,
    total: u64,
    summary: Option<SearchSummary>,
    seq: u64,
}

impl<L: LocationHistory> SearchView<L> {
    pub fn new(kind: EntityKind, config: &EngineConfig, location: L) -> Self {
        let default_filter = kind.default_filter(config.default_limit);
        let manager = FilterStateManager::new(config, kind.multi_value_keys(), default_filter);
        let filter = manager.default_filter().clone();
        Self {
            kind,
            manager,
            location,
            filter,
            sort: SortState::unsorted(),
            fields: Vec::new(),
            list: Vec::new(),
            total: 0,
            summary: None,
            seq: 0,
        }
    }

    /// Restricts the columns requested from the service.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn list(&self) -> &[Record] {
        &self.list
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Summary of the last applied page; `None` before the first search.
    pub fn summary(&self) -> Option<SearchSummary> {
        self.summary
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn manager(&self) -> &FilterStateManager {
        &self.manager
    }

    /// Sequence number of the most recent search.
    pub fn latest_seq(&self) -> u64 {
        self.seq
    }

    /// Builds the filter from the current URL and restores its sort.
    pub fn init(&mut self) -> &Filter {
        let query = self.location.current_query();
        self.filter = self.manager.merge(&query, &self.filter);
        self.sort = SortState::from_sort(self.filter.sort.as_ref());
        debug!("Initialized {} search view from {:?}", self.kind, query);
        &self.filter
    }

    /// Header click on `field`.
    pub fn sort_clicked(&mut self, field: &str) -> SortChange {
        let change = handle_sort(field, &self.sort);
        self.sort = change.state.clone();
        self.filter = FilterStateManager::build_sort_filter(&self.filter, &self.sort);
        change
    }

    /// Pager click; a changed size also applies.
    pub fn page_changed(&mut self, page: u32, size: u32) {
        let limit = coerce_limit(size, self.manager.page_sizes());
        self.filter.page = page.max(1);
        self.filter.limit = limit;
    }

    /// Page-size select; goes back to page 1.
    pub fn page_size_changed(&mut self, size: u32) {
        self.filter.limit = coerce_limit(size, self.manager.page_sizes());
        self.filter.page = 1;
    }

    /// Explicit search button: clears the sort and goes back to page 1.
    pub fn search_clicked(&mut self) -> SortChange {
        let change = remove_sort_status(&self.sort);
        self.sort = change.state.clone();
        self.filter.sort = None;
        self.filter.page = 1;
        change
    }

    /// Multi-value checkbox; goes back to page 1.
    pub fn toggle_value(&mut self, key: &str, value: &str, checked: bool) {
        self.filter.toggle_value(key, value, checked);
        self.filter.page = 1;
    }

    /// Text or select input.
    pub fn set_value(&mut self, key: &str, value: &str) {
        self.filter.set_value(key, value);
    }

    /// Records the filter in the URL and starts a numbered search.
    pub fn begin_search(&mut self, is_first_load: bool) -> SearchTicket {
        self.seq += 1;
        let url = self.manager.add_parameters_into_url(
            &self.filter,
            is_first_load,
            &mut self.location,
        );
        SearchTicket {
            seq: self.seq,
            filter: self.filter.clone(),
            limit: self.filter.limit,
            page: self.filter.page,
            url,
        }
    }

    /// Applies a response unless a newer search was started.
    pub fn complete_search(&mut self, ticket: &SearchTicket, page: SearchPage) -> SearchCompletion {
        if ticket.seq < self.seq {
            debug!(
                "Dropping stale {} search #{} (latest #{})",
                self.kind, ticket.seq, self.seq
            );
            return SearchCompletion::Stale;
        }
        self.summary = Some(page.summary());
        self.total = page.total;
        self.list = page.list;
        SearchCompletion::Applied
    }

    /// Begins and completes one search.
    pub async fn run(
        &mut self,
        client: &PagedQueryClient,
        is_first_load: bool,
    ) -> EngineResult<SearchCompletion> {
        let ticket = self.begin_search(is_first_load);
        let page = client
            .search(&ticket.filter, ticket.limit, ticket.page, &self.fields)
            .await?;
        Ok(self.complete_search(&ticket, page))
    }
}
