//! Wires the client together: one transport, one query cache, one store
//! and one event bus shared by every resource.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::models::Entity;
use tokio::task::JoinHandle;
use tracing::info;

use crate::hooks::query_cache::QueryCache;
use crate::hooks::use_realtime::{EventBus, RealtimeSync};
use crate::hooks::use_resource::{create_data_layer, DataLayer};
use crate::services::api::{ApiClient, HttpTransport, ReqwestTransport};
use crate::services::config::ClientConfig;
use crate::services::media::MediaService;
use crate::state::AppStore;

/// Everything a screen needs to talk to the back office
#[derive(Clone)]
pub struct ClientContext {
    pub config: ClientConfig,
    pub client: ApiClient,
    pub cache: QueryCache,
    pub store: AppStore,
    pub events: EventBus,
    pub media: MediaService,
}

impl ClientContext {
    /// Build a context over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let client = ApiClient::new(transport);
        Self {
            cache: QueryCache::new(config.stale_time),
            media: MediaService::new(client.clone()),
            store: AppStore::default(),
            events: EventBus::default(),
            client,
            config,
        }
    }

    pub fn data_layer<T, TRequest>(&self, resource: &str) -> DataLayer<T, TRequest>
    where
        T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
        TRequest: Serialize,
    {
        create_data_layer(self.client.clone(), self.cache.clone(), resource)
    }

    /// Keep `layer` in step with pushed events for the signed-in branch.
    /// Returns `None` while no branch is selected.
    pub fn spawn_realtime<T, TRequest>(&self, layer: DataLayer<T, TRequest>) -> Option<JoinHandle<()>>
    where
        T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
        TRequest: Serialize + Send + 'static,
    {
        let branch_id = self.store.snapshot().current_branch_id()?.to_string();
        Some(RealtimeSync::new(layer, branch_id).spawn(&self.events))
    }
}

/// Build the client from `config` over the reqwest transport
pub fn initialize_client(config: ClientConfig) -> Result<ClientContext> {
    let transport = ReqwestTransport::new(config.clone()).context("failed to build HTTP client")?;
    info!(
        base_url = %config.base_url,
        api_prefix = %config.api_prefix,
        stale_secs = config.stale_time.as_secs(),
        "client initialized"
    );
    Ok(ClientContext::with_transport(config, Arc::new(transport)))
}

/// `initialize_client` with settings read from the environment
pub fn initialize_client_from_env() -> Result<ClientContext> {
    let config = ClientConfig::from_env().context("failed to read client configuration")?;
    initialize_client(config)
}
