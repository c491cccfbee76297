use axum::extract::FromRef;

use crate::catalog_store::CatalogStore;
use crate::engine::CatalogEngine;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCatalogEngine = Arc<CatalogEngine>;
pub type GuardedCatalogStore = Arc<dyn CatalogStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engine: GuardedCatalogEngine,
    pub catalog_store: GuardedCatalogStore,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedCatalogEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for GuardedCatalogStore {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
