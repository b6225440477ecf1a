use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use linenroom_infra::{
    ChangeFeed, FulfillmentEngine, InMemoryLinenStore, LinenConfig, LinenStore,
    PostgresLinenStore, Reporting, RequestEngine, StorageConfig,
};

/// Store handle shared by every engine.
pub type SharedStore = Arc<dyn LinenStore>;

pub struct AppServices {
    pub requests: RequestEngine<SharedStore>,
    pub fulfillment: FulfillmentEngine<SharedStore>,
    pub feed: ChangeFeed<SharedStore>,
    pub reporting: Reporting<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, config: &LinenConfig) -> Self {
        Self {
            requests: RequestEngine::new(store.clone(), config.floors),
            fulfillment: FulfillmentEngine::new(store.clone(), config.floors, config.restock_quantity),
            feed: ChangeFeed::new(store.clone()),
            reporting: Reporting::new(store, config.floors, config.history_limit, config.utc_offset),
        }
    }
}

/// Open the configured store, make sure every catalog and stock row exists,
/// and build the engines over it.
pub async fn build_services(config: &LinenConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match &config.storage {
        StorageConfig::InMemory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(InMemoryLinenStore::new())
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresLinenStore::connect(database_url, *max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to create schema")?;
            Arc::new(store)
        }
    };

    store
        .seed(&config.catalog, &config.floors, Utc::now())
        .await
        .context("failed to seed catalog and floor stock")?;

    Ok(AppServices::new(store, config))
}
