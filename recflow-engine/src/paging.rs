//! Paged queries against a record service.

use crate::error::EngineResult;
use crate::filter::Filter;
use crate::notice::SearchSummary;
use crate::service::RecordService;
use recflow_types::{HistoryEntry, Record};
use std::sync::Arc;
use tracing::{debug, warn};

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub list: Vec<Record>,
    /// Server-side count of all matches.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl SearchPage {
    /// Zero-based index of the first row.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn summary(&self) -> SearchSummary {
        SearchSummary::new(self.total, self.page, self.limit, self.list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// One page of history entries.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    /// Cursor for the next page; `None` once a partial page came back.
    pub next_page_token: Option<String>,
}

/// The cursor after `entries`: the id of the last entry of a full page.
pub fn next_page_token(entries: &[HistoryEntry], limit: u32) -> Option<String> {
    if limit > 0 && entries.len() >= limit as usize {
        entries.last().map(|e| e.id.clone())
    } else {
        None
    }
}

/// Issues search and history queries.
#[derive(Clone)]
pub struct PagedQueryClient {
    service: Arc<dyn RecordService>,
}

impl PagedQueryClient {
    pub fn new(service: Arc<dyn RecordService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn RecordService> {
        &self.service
    }

    /// Runs one search.
    pub async fn search(
        &self,
        filter: &Filter,
        limit: u32,
        page: u32,
        fields: &[String],
    ) -> EngineResult<SearchPage> {
        let page = page.max(1);
        debug!("Searching page {} (limit {})", page, limit);
        let result = self.service.search(filter, limit, page, fields).await?;
        if result.list.len() > limit as usize {
            warn!(
                "Search returned {} records for limit {}",
                result.list.len(),
                limit
            );
        }
        Ok(SearchPage {
            list: result.list,
            total: result.total,
            page,
            limit,
        })
    }

    /// Fetches one history page.
    pub async fn get_histories(
        &self,
        id: &str,
        limit: u32,
        next_page_token: Option<&str>,
    ) -> EngineResult<HistoryPage> {
        let entries = self
            .service
            .get_histories(id, limit, next_page_token)
            .await?;
        let next_page_token = self::next_page_token(&entries, limit);
        debug!(
            "Loaded {} history entries for {} (more: {})",
            entries.len(),
            id,
            next_page_token.is_some()
        );
        Ok(HistoryPage {
            entries,
            next_page_token,
        })
    }
}

/// "Load more" state of a history view.
#[derive(Debug, Clone)]
pub struct HistoryPager {
    id: String,
    limit: u32,
    entries: Vec<HistoryEntry>,
    next_page_token: Option<String>,
    loaded: bool,
}

impl HistoryPager {
    pub fn new(id: impl Into<String>, limit: u32) -> Self {
        Self {
            id: id.into(),
            limit,
            entries: Vec::new(),
            next_page_token: None,
            loaded: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entries loaded so far, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    /// Whether a "load more" control should be shown.
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }

    /// Loads the first page, discarding anything loaded before.
    pub async fn load_first(&mut self, client: &PagedQueryClient) -> EngineResult<usize> {
        let page = client.get_histories(&self.id, self.limit, None).await?;
        let count = page.entries.len();
        self.entries = page.entries;
        self.next_page_token = page.next_page_token;
        self.loaded = true;
        Ok(count)
    }

    /// Appends the next page. Without a cursor nothing is requested.
    pub async fn load_more(&mut self, client: &PagedQueryClient) -> EngineResult<usize> {
        if !self.loaded {
            return self.load_first(client).await;
        }
        let Some(token) = self.next_page_token.clone() else {
            return Ok(0);
        };
        let page = client
            .get_histories(&self.id, self.limit, Some(&token))
            .await?;
        let count = page.entries.len();
        self.entries.extend(page.entries);
        self.next_page_token = page.next_page_token;
        Ok(count)
    }
}
