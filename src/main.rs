use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use discovery_api::{
    config::{Config, ContentProviderKind},
    db::{
        create_pool, create_redis_client, run_migrations, Cache, CacheWriterHandle,
        PgFavoritesStore, RedisBehaviorStore,
    },
    routes::{create_router, AppState},
    services::{
        providers::{OmdbProvider, SteamProvider},
        ContentProvider, HistoryLimits,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let redis_client = config
        .redis_url
        .as_deref()
        .map(create_redis_client)
        .transpose()?;

    let (cache, cache_writer): (Option<Cache>, Option<CacheWriterHandle>) = match &redis_client {
        Some(client) => {
            let (cache, handle) = Cache::new(client.clone());
            (Some(cache), Some(handle))
        }
        None => {
            tracing::warn!("REDIS_URL not set, lookups are uncached and behavior is kept in memory");
            (None, None)
        }
    };

    let provider: Arc<dyn ContentProvider> = match config.content_provider {
        ContentProviderKind::Steam => Arc::new(SteamProvider::new(
            config.steam_store_url.clone(),
            config.steam_language.clone(),
            config.steam_country.clone(),
            cache,
        )),
        ContentProviderKind::Omdb => Arc::new(OmdbProvider::new(
            config.omdb_api_key.clone().unwrap_or_default(),
            config.omdb_api_url.clone(),
            cache,
        )),
    };

    let mut builder = AppState::builder(Arc::clone(&provider))
        .history_limits(HistoryLimits {
            max_entries: config.history_max_entries,
            keep_after_search: config.history_keep_after_search,
        })
        .recommendation_limits(config.recommendations.clone());

    if let Some(client) = redis_client {
        builder = builder.behavior_store(Arc::new(RedisBehaviorStore::new(client)));
    }

    match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            builder = builder.favorites_store(Arc::new(PgFavoritesStore::new(pool)));
        }
        None => tracing::warn!("DATABASE_URL not set, favorites and comments are kept in memory"),
    }

    let app = create_router(builder.build());

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        address = %address,
        provider = provider.name(),
        "Server listening"
    );

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
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
