// HTTP surface - router, shared context and server startup

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use tokio::signal;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::downloader::{CliInfoExtractor, Downloader, ToolManager};

pub mod error;
pub mod routes;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub downloader: Arc<Downloader>,
    pub tools: Arc<ToolManager>,
    /// CORS allow-list
    pub allowed_origins: Vec<String>,
}

impl AppContext {
    /// Production wiring: yt-dlp CLI extractor with the configured network settings
    pub fn from_config(config: &ServerConfig) -> Self {
        let extractor = CliInfoExtractor::new(
            config.ytdlp_path.clone(),
            config.network(),
            config.probe_timeout,
        );

        Self {
            downloader: Arc::new(Downloader::new(Arc::new(extractor), config.downloader())),
            tools: Arc::new(ToolManager::new(config.ytdlp_path.clone())),
            allowed_origins: config.allowed_origins(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let origins: Vec<HeaderValue> = ctx
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers are mirrored
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    routes::api_routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let addr = config.bind_addr().context("Invalid server address")?;

    let ctx = AppContext::from_config(&config);
    tracing::info!("CORS allowed origins: {:?}", ctx.allowed_origins);
    tracing::info!(
        "Using extractor {} (temp root {})",
        ctx.downloader.extractor_name(),
        ctx.downloader.config().temp_root.display()
    );
    if !ctx.downloader.extractor_available() {
        tracing::warn!("yt-dlp not found; downloads will fail until it is installed");
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
