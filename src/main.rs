use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod database;
mod error;
mod menu;
mod models;
mod monitor;
mod queries;
mod routes;

use cache::TtlCache;
use config::Config;
use database::Database;
use error::ErrorHandler;
use menu::MenuService;
use monitor::PerformanceMonitor;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restaurant_menu_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the data source
    let pool = sqlx::SqlitePool::connect(&config.database_url).await?;
    let database = Arc::new(Database::new(pool));
    database.init_tables().await?;

    let cache = Arc::new(TtlCache::new());
    let monitor = Arc::new(PerformanceMonitor::new());
    let handler = ErrorHandler::new(config.environment);
    let service = Arc::new(MenuService::new(
        database,
        cache.clone(),
        handler,
        monitor.clone(),
        config.menu_data_ttl(),
    ));

    // Sweep expired cache entries in the background
    let cleanup_cache = cache.clone();
    let cleanup_interval = config.cache_cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            cleanup_cache.cleanup();
        }
    });

    if config.warm_cache_on_start {
        let warm_service = service.clone();
        tokio::spawn(async move {
            warm_service.warm_all().await;
        });
    }

    let config = Arc::new(config);
    let bind_addr = config.bind_addr.clone();

    // Create application state
    let state = AppState {
        config,
        service,
        cache,
        monitor,
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
