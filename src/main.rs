use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunematch::{
    config::{Config, StorageBackend},
    db::{create_pool, create_redis_client, Cache, CacheWriterHandle, MemoryStore, PgStore, Store},
    middleware::cors_layer,
    routes::{create_router, AppState},
    services::catalog::seed_from_file,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunematch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.database_max_connections)
                .await
                .context("Failed to create database pool")?;
            let store = PgStore::new(pool);
            store.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Using PostgreSQL store");
            serve(Arc::new(store), &config).await
        }
        StorageBackend::Memory => {
            tracing::info!("Using in-memory store");
            serve(Arc::new(MemoryStore::new()), &config).await
        }
    }
}

async fn serve<S: Store>(store: Arc<S>, config: &Config) -> anyhow::Result<()> {
    if let Some(path) = &config.catalog_seed_path {
        seed_from_file(&*store, path).await?;
    }

    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url)?;
            let (cache, handle) = Cache::new(client).await;
            tracing::info!("Taste profile cache enabled");
            (Some(cache), Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, taste profile cache disabled");
            (None, None)
        }
    };

    let state = Arc::new(AppState::new(store, cache, config.profile_cache_ttl));
    let app = create_router(state).layer(cors_layer(config.cors_allowed_origin.as_deref())?);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    tracing::info!("Server running on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    flush_cache(cache_handle).await;
    Ok(())
}

async fn flush_cache(handle: Option<CacheWriterHandle>) {
    if let Some(handle) = handle {
        handle.shutdown().await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
