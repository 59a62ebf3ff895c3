//! # Parley Server
//!
//! Main entry point for the Parley chat backend: user CRUD over
//! Postgres, a Redis-backed cache wrapper, and health probes behind an
//! Axum HTTP surface.

use parley_config::{AppConfig, ConfigLoader};
use parley_core::{ParleyError, ParleyResult};
use parley_repository::{create_pool, PgUserRepository};
use parley_rest::{create_router, AppState};
use parley_security::PasswordHasher;
use parley_service::{
    CacheService, MemoryCacheBackend, RedisCacheBackend, UserService, UserServiceImpl,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!("Starting Parley server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    if let Err(e) = run(config).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> ParleyResult<()> {
    let db_pool = create_pool(&config.database).await?;
    db_pool.run_migrations().await?;

    let cache = build_cache_service(&config)?;

    let user_repository = Arc::new(PgUserRepository::new(db_pool.clone()));
    let password_hasher = Arc::new(PasswordHasher::new());
    let user_service: Arc<dyn UserService> =
        Arc::new(UserServiceImpl::new(user_repository, password_hasher));

    let state = AppState::new(user_service, cache);
    let router = create_router(state, &config.server);

    let addr = config.server.addr();
    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ParleyError::Internal(format!("Server error: {}", e)))?;

    db_pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Selects the cache backend: Redis when configured, otherwise the
/// bounded in-memory store.
fn build_cache_service(config: &AppConfig) -> ParleyResult<CacheService> {
    if config.redis.is_configured() {
        let redis_config = deadpool_redis::Config::from_url(config.redis.url());
        let pool = redis_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| ParleyError::Cache(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "Using Redis cache backend at {}:{}",
            config.redis.host, config.redis.port
        );
        Ok(CacheService::new(Arc::new(RedisCacheBackend::with_ttl(
            Arc::new(pool),
            config.cache.default_ttl(),
        ))))
    } else {
        warn!("Redis not configured; using in-memory cache backend");
        Ok(CacheService::new(Arc::new(MemoryCacheBackend::with_limits(
            config.cache.default_ttl(),
            config.cache.max_items,
        ))))
    }
}

fn init_logging(config: &AppConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // RUST_LOG overrides the configured level.
    let default_filter = format!("{},tower_http=debug", config.logging.level);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
