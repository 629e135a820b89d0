//! HTTP implementation of [`RecordService`].
//!
//! One instance talks to one entity path (`{base_url}/{path}`). Status codes
//! the result protocol knows about are folded into result codes; everything
//! else becomes an [`EngineError`].

use crate::config::ClientConfig;
use crate::error::ClientResult;
use async_trait::async_trait;
use recflow_engine::outcome::{NOT_FOUND, VERSION_CONFLICT};
use recflow_engine::{
    encode_query, EngineError, EngineResult, EntityKind, Filter, RawResult, RecordService,
    LIMIT_PARAM, PAGE_PARAM,
};
use recflow_types::{HistoryEntry, Record, SearchResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Query parameter restricting the returned columns.
pub const FIELDS_PARAM: &str = "fields";

/// Query parameter carrying the history cursor.
pub const HISTORY_CURSOR_PARAM: &str = "historyId";

/// Record service backed by a REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpRecordService {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpRecordService {
    /// Creates a service for one endpoint with its own HTTP client.
    pub fn new(url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    /// Creates a service sharing an existing HTTP client.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    /// Creates the service for an entity kind from the client config.
    pub fn for_kind(client: Client, config: &ClientConfig, kind: EntityKind) -> Self {
        let mut service = Self::with_client(client, config.url_for(kind));
        service.auth_token = config.auth_token.clone();
        service
    }

    /// Sends a bearer token with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.url, urlencoding::encode(id))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> EngineResult<Response> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| EngineError::Transport(format!("{what} request failed: {e}")))
    }

    /// Sends a mutation carrying a record payload and folds its status.
    ///
    /// `conflict` is the code reported for 409; creates use `0` there since
    /// a conflict on create means the id is taken.
    async fn mutate(
        &self,
        request: RequestBuilder,
        what: &str,
        conflict: i64,
    ) -> EngineResult<RawResult> {
        let response = self.send(request, what).await?;
        let status = response.status();
        if status.is_success() {
            let body = read_body(response, what).await?;
            if body.trim().is_empty() {
                debug!("{} acknowledged without a body", what);
                return Ok(RawResult::Code(1));
            }
            return RawResult::from_json(&body);
        }
        match status.as_u16() {
            404 | 410 => Ok(RawResult::Code(NOT_FOUND)),
            409 => Ok(RawResult::Code(conflict)),
            422 => {
                let errors = read_json(response, what).await?;
                RawResult::Errors(errors).validated()
            }
            _ => Err(status_error(response, what).await),
        }
    }

    /// Sends an approve/reject/delete call and returns its result code.
    async fn decide(&self, request: RequestBuilder, what: &str) -> EngineResult<i64> {
        let response = self.send(request, what).await?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.trim().is_empty() {
                return Ok(1);
            }
            return parse_code(&body, what);
        }
        match status.as_u16() {
            404 | 410 => Ok(NOT_FOUND),
            409 => {
                let body = response.text().await.unwrap_or_default();
                if body.trim().is_empty() {
                    warn!("{} conflict without a result code", what);
                    return Ok(VERSION_CONFLICT);
                }
                parse_code(&body, what)
            }
            _ => Err(status_error(response, what).await),
        }
    }
}

async fn read_body(response: Response, what: &str) -> EngineResult<String> {
    response
        .text()
        .await
        .map_err(|e| EngineError::Transport(format!("{what} response unreadable: {e}")))
}

/// Deserializes a response body.
async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> EngineResult<T> {
    let body = read_body(response, what).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Reads a bare numeric result code.
fn parse_code(body: &str, what: &str) -> EngineResult<i64> {
    match serde_json::from_str::<Value>(body)? {
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            EngineError::UnexpectedResult(format!("{what} answered non-integer code {n}"))
        }),
        other => Err(EngineError::UnexpectedResult(format!(
            "{what} answered {other} instead of a result code"
        ))),
    }
}

/// Maps a status the result protocol does not cover to an error.
async fn status_error(response: Response, what: &str) -> EngineError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = format!("{what} failed ({status}): {body}");
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        EngineError::Unauthorized(message)
    } else {
        EngineError::Transport(message)
    }
}

/// Builds the search query: filter predicates, limit, sort, page and fields.
fn search_query(filter: &Filter, limit: u32, page: u32, fields: &[String]) -> String {
    let mut paged = filter.clone();
    paged.limit = limit;
    paged.page = 1;
    let mut query = encode_query(&paged);
    query.push_str(&format!("&{PAGE_PARAM}={}", page.max(1)));
    if !fields.is_empty() {
        query.push_str(&format!(
            "&{FIELDS_PARAM}={}",
            urlencoding::encode(&fields.join(","))
        ));
    }
    query
}

#[async_trait]
impl RecordService for HttpRecordService {
    async fn search(
        &self,
        filter: &Filter,
        limit: u32,
        page: u32,
        fields: &[String],
    ) -> EngineResult<SearchResult> {
        let url = format!("{}?{}", self.url, search_query(filter, limit, page, fields));
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url), "search").await?;
        if !response.status().is_success() {
            return Err(status_error(response, "search").await);
        }
        read_json(response, "search").await
    }

    async fn load(&self, id: &str) -> EngineResult<Option<Record>> {
        let response = self.send(self.client.get(self.record_url(id)), "load").await?;
        if response.status().is_success() {
            return read_json(response, "load").await.map(Some);
        }
        match response.status().as_u16() {
            404 | 410 => {
                debug!("Record {} not found", id);
                Ok(None)
            }
            _ => Err(status_error(response, "load").await),
        }
    }

    async fn create(&self, record: &Record) -> EngineResult<RawResult> {
        debug!("POST {} (id={})", self.url, record.id());
        self.mutate(self.client.post(&self.url).json(record), "create", NOT_FOUND)
            .await
    }

    async fn update(&self, record: &Record) -> EngineResult<RawResult> {
        let url = self.record_url(record.id());
        debug!("PUT {}", url);
        self.mutate(self.client.put(&url).json(record), "update", VERSION_CONFLICT)
            .await
    }

    async fn patch(&self, id: &str, partial: &Map<String, Value>) -> EngineResult<RawResult> {
        let url = self.record_url(id);
        debug!("PATCH {} ({} fields)", url, partial.len());
        self.mutate(self.client.patch(&url).json(partial), "patch", VERSION_CONFLICT)
            .await
    }

    async fn approve(&self, id: &str) -> EngineResult<i64> {
        let url = format!("{}/approve", self.record_url(id));
        debug!("PATCH {}", url);
        self.decide(self.client.patch(&url), "approve").await
    }

    async fn reject(&self, id: &str) -> EngineResult<i64> {
        let url = format!("{}/reject", self.record_url(id));
        debug!("PATCH {}", url);
        self.decide(self.client.patch(&url), "reject").await
    }

    async fn delete(&self, id: &str) -> EngineResult<i64> {
        let url = self.record_url(id);
        debug!("DELETE {}", url);
        self.decide(self.client.delete(&url), "delete").await
    }

    async fn get_histories(
        &self,
        id: &str,
        limit: u32,
        next_page_token: Option<&str>,
    ) -> EngineResult<Vec<HistoryEntry>> {
        let mut url = format!("{}/history?{LIMIT_PARAM}={limit}", self.record_url(id));
        if let Some(token) = next_page_token {
            url.push_str(&format!(
                "&{HISTORY_CURSOR_PARAM}={}",
                urlencoding::encode(token)
            ));
        }
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url), "history").await?;
        if !response.status().is_success() {
            return Err(status_error(response, "history").await);
        }
        read_json(response, "history").await
    }
}
