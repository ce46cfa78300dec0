use std::sync::Arc;

use crate::{
    config::{Config, StorageBackend},
    db::{self, Cache, CacheWriterHandle},
    models::NewMovie,
    services::{AuthService, BatchQueue, CatalogInserter, Inserter},
    stores::{CatalogStore, InteractionStore, MemoryStore, PgStore, UserStore},
};

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub interactions: Arc<dyn InteractionStore>,
    pub users: Arc<dyn UserStore>,
    /// Trending feed cache; `None` when Redis is not configured
    pub cache: Option<Cache>,
    pub auth: Arc<AuthService>,
    pub batch_queue: BatchQueue<NewMovie>,
    /// Writes queued movies into the catalog
    pub movie_inserter: Arc<dyn Inserter<NewMovie>>,
    pub feed_default_limit: usize,
}

impl AppState {
    /// State backed by in-memory stores and no cache
    pub fn in_memory(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(config, store.clone(), store.clone(), store, None)
    }

    /// Builds the state described by `config`, connecting to PostgreSQL and
    /// Redis as needed. The returned handle flushes the cache writer on shutdown.
    pub async fn from_config(config: &Config) -> anyhow::Result<(Self, Option<CacheWriterHandle>)> {
        let (cache, cache_handle) = match &config.redis_url {
            Some(url) => {
                let client = db::create_redis_client(url)?;
                let (cache, handle) = Cache::new(client);
                tracing::info!("Trending feed cache enabled");
                (Some(cache), Some(handle))
            }
            None => (None, None),
        };

        let state = match config.storage {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let store = Arc::new(MemoryStore::new());
                Self::with_stores(config, store.clone(), store.clone(), store, cache)
            }
            StorageBackend::Postgres => {
                let pool = db::create_pool(&config.database_url).await?;
                let store = Arc::new(PgStore::new(pool));
                store.migrate().await?;
                Self::with_stores(config, store.clone(), store.clone(), store, cache)
            }
        };

        Ok((state, cache_handle))
    }

    fn with_stores(
        config: &Config,
        catalog: Arc<dyn CatalogStore>,
        interactions: Arc<dyn InteractionStore>,
        users: Arc<dyn UserStore>,
        cache: Option<Cache>,
    ) -> Self {
        let movie_inserter: Arc<dyn Inserter<NewMovie>> =
            Arc::new(CatalogInserter::new(catalog.clone()));

        Self {
            catalog,
            interactions,
            users,
            cache,
            auth: Arc::new(AuthService::new(
                &config.jwt_secret,
                config.token_ttl_secs,
                config.admin_username.clone(),
            )),
            batch_queue: BatchQueue::new(config.queue_config()),
            movie_inserter,
            feed_default_limit: config.feed_default_limit,
        }
    }
}
