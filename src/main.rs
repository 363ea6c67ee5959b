use std::sync::Arc;
use std::time::Duration;

use household_api::{
    api::{create_router, AppState},
    config::Config,
    db::{self, CacheWriterHandle, InMemoryMetadataCache, MetadataCache, PgStore, RedisMetadataCache},
    services::{
        metadata::{AiInferenceSource, GoogleBooksSource, MetadataSource, OpenLibrarySource},
        MetadataMerger, ProviderRegistry,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "household_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database ready");
    let store = Arc::new(PgStore::new(pool));

    let providers = ProviderRegistry::from_config(&config)?;

    let cache_ttl = Duration::from_secs(config.metadata_cache_ttl_days * SECS_PER_DAY);
    let (metadata_cache, cache_writer): (Arc<dyn MetadataCache>, Option<CacheWriterHandle>) =
        match config.redis_url.as_deref() {
            Some(redis_url) => {
                let client = db::create_redis_client(redis_url)?;
                let (cache, handle) =
                    RedisMetadataCache::connect(client, cache_ttl.as_secs()).await?;
                tracing::info!("Using Redis metadata cache");
                (Arc::new(cache), Some(handle))
            }
            None => {
                tracing::info!(
                    capacity = config.metadata_cache_capacity,
                    "Using in-process metadata cache"
                );
                (
                    Arc::new(InMemoryMetadataCache::new(
                        config.metadata_cache_capacity,
                        cache_ttl,
                    )),
                    None,
                )
            }
        };

    let metadata_timeout = Duration::from_secs(config.metadata_timeout_secs);
    let metadata_http = reqwest::Client::builder().timeout(metadata_timeout).build()?;
    let sources: Vec<Arc<dyn MetadataSource>> = vec![
        Arc::new(AiInferenceSource::new(
            providers.clone(),
            config.metadata_provider.clone(),
        )),
        Arc::new(GoogleBooksSource::new(
            metadata_http.clone(),
            config.google_books_api_key.clone(),
            config.google_books_api_url.clone(),
        )),
        Arc::new(OpenLibrarySource::new(
            metadata_http,
            config.open_library_api_url.clone(),
        )),
    ];
    let metadata = MetadataMerger::new(sources, metadata_cache, metadata_timeout);

    let state = AppState::new(store.clone(), store, providers, metadata);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
