use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod models;
mod services;

use config::Settings;
use services::{CacheCleanupTask, CacheStore, DownloadService, S3BlobStore, YtDlpFetcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before reading config
    dotenv::dotenv().ok();

    // Fail fast on missing storage credentials
    let settings = Settings::from_env()?;

    // Initialize tracing; RUST_LOG overrides LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Initialize storage and cache
    let storage = Arc::new(
        S3BlobStore::new(settings.aws_bucket_name.clone(), settings.aws_region.clone()).await,
    );
    let cache = Arc::new(CacheStore::new(settings.cache_dir.clone(), settings.cache_ttl).await?);

    // Initialize download service
    let fetcher = Arc::new(YtDlpFetcher::new());
    let download_service = Arc::new(DownloadService::new(
        fetcher,
        storage,
        settings.max_concurrent_fetchers,
        settings.download_timeout,
    ));

    // Start cache cleanup task
    let shutdown = CancellationToken::new();
    let cleanup_task = CacheCleanupTask::new(cache.clone(), settings.cleanup_interval);
    let cleanup_handle = cleanup_task.start(shutdown.clone());
    tracing::info!(
        "缓存清理任务已启动 (间隔: {}h)",
        settings.cleanup_interval.as_secs() / 3600
    );

    // Build our application with routes
    let app = Router::new()
        .route("/", get(|| async { "Media Download Backend API v1.0" }))
        .route("/health", get(api::health::health_check))
        .route("/api/v1/download", post(api::download::download))
        .route("/api/v1/batch-download", post(api::download::batch_download))
        .layer(CorsLayer::permissive())
        .with_state(api::AppState { download_service });

    // Run the server
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    tracing::info!("🚀 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the janitor before exiting
    shutdown.cancel();
    let _ = cleanup_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听关闭信号: {}", e);
    }
}
