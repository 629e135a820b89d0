//! Application context: one record service per entity kind.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::HttpRecordService;
use recflow_engine::{
    EditSession, EngineConfig, EntityKind, PagedQueryClient, RecordService,
};
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Services and configuration shared by every view.
///
/// Built once at startup and passed down explicitly.
#[derive(Clone)]
pub struct AppContext {
    config: ClientConfig,
    services: BTreeMap<EntityKind, Arc<dyn RecordService>>,
}

impl AppContext {
    /// Builds HTTP services for every entity kind, sharing one client.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        let services = EntityKind::ALL
            .into_iter()
            .map(|kind| {
                let service = HttpRecordService::for_kind(client.clone(), &config, kind);
                debug!("Registered {} at {}", kind, service.url());
                (kind, Arc::new(service) as Arc<dyn RecordService>)
            })
            .collect();
        info!("Record services ready at {}", config.base_url);
        Ok(Self { config, services })
    }

    /// A context with no services; register them with [`Self::with_service`].
    pub fn empty(config: ClientConfig) -> Self {
        Self {
            config,
            services: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the service of one kind.
    pub fn with_service(mut self, kind: EntityKind, service: Arc<dyn RecordService>) -> Self {
        self.services.insert(kind, service);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config.engine
    }

    /// The service of a kind.
    pub fn service(&self, kind: EntityKind) -> ClientResult<Arc<dyn RecordService>> {
        self.services
            .get(&kind)
            .cloned()
            .ok_or_else(|| ClientError::Config(format!("no service registered for {kind}")))
    }

    /// A query client for a kind's searches and histories.
    pub fn query_client(&self, kind: EntityKind) -> ClientResult<PagedQueryClient> {
        Ok(PagedQueryClient::new(self.service(kind)?))
    }

    /// Loads a record into an edit session; `None` when it does not exist.
    pub async fn open_session(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> ClientResult<Option<EditSession>> {
        let service = self.service(kind)?;
        let session =
            EditSession::load(kind, service.as_ref(), id, self.engine_config().clone()).await?;
        Ok(session)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("kinds", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}
