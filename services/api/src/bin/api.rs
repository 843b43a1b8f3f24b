//! services/api/src/bin/api.rs

use chapter_api::{
    adapters::{
        spawn_expiry_sweeper, ExpiringCache, MemoryQueryCache, PgChapterStore, PgQueryCache,
    },
    config::{CacheBackend, ConfigError, Config},
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use chapter_core::ports::QueryCache;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// How often expired cache entries are swept.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgChapterStore::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Query Cache ---
    let cache: Arc<dyn QueryCache> = match config.cache_backend {
        CacheBackend::Postgres => {
            let cache = Arc::new(PgQueryCache::new(db_pool.clone()));
            spawn_expiry_sweeper(cache.clone() as Arc<dyn ExpiringCache>, CACHE_SWEEP_INTERVAL);
            cache as Arc<dyn QueryCache>
        }
        CacheBackend::Memory => {
            let cache = Arc::new(MemoryQueryCache::new());
            spawn_expiry_sweeper(cache.clone() as Arc<dyn ExpiringCache>, CACHE_SWEEP_INTERVAL);
            cache as Arc<dyn QueryCache>
        }
    };
    info!(
        "Query cache backend: {:?} (ttl {}s)",
        config.cache_backend,
        config.cache_ttl.as_secs()
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(store, cache, &config));

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static("x-admin")]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
