pub mod config;
pub mod downloader;
pub mod platform;
pub mod server;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;

/// Initialize logging and serve until shutdown
pub async fn run(config: ServerConfig) -> Result<()> {
    // RUST_LOG wins over the --verbose default
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("FrameFetch {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Frontend URL: {}", config.frontend_url);

    server::start_server(config).await
}
