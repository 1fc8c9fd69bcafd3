use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movieshelf_api::{
    api::{create_router, AppState},
    config::{Config, StoreBackend},
    db::{create_pool, create_redis_client, run_migrations, Cache},
    services::TmdbClient,
    store::{DocumentStore, InMemoryStore, PgDocumentStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movieshelf_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            run_migrations(&pool).await?;
            tracing::info!("Using PostgreSQL document store");
            Arc::new(PgDocumentStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; user data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client);
    let catalog = TmdbClient::new(cache, config.tmdb_api_key.clone(), config.tmdb_api_url.clone());

    let app = create_router(AppState::new(store, Arc::new(catalog)));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
