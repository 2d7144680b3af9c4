// API routes

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use super::error::AppError;
use super::AppContext;
use crate::downloader::models::{Artifact, FormatDebugReport, VideoInfo};
use crate::downloader::{DownloadError, FormatKind, QualityTarget};
use crate::platform;

#[derive(Debug, Deserialize)]
pub struct VideoUrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_format_type")]
    pub format_type: String,
}

fn default_quality() -> String {
    "720p".to_string()
}

fn default_format_type() -> String {
    "video".to_string()
}

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/platforms", get(platforms))
        .route("/api/video/info", post(video_info))
        .route("/api/video/download", post(download))
        .route("/api/debug/formats", post(debug_formats))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "FrameFetch API is running!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let tools = ctx.tools.get_all_tools().await;
    Json(json!({
        "status": "healthy",
        "message": "FrameFetch API is running",
        "extractor": ctx.downloader.extractor_name(),
        "tools": tools,
    }))
}

async fn platforms() -> impl IntoResponse {
    Json(json!({ "platforms": platform::supported_platforms() }))
}

async fn video_info(
    State(ctx): State<AppContext>,
    Json(request): Json<VideoUrlRequest>,
) -> Result<Json<VideoInfo>, AppError> {
    const CONTEXT: &str = "Failed to extract video info";

    let platform =
        platform::detect_platform(&request.url).map_err(|e| AppError::from_download(CONTEXT, e))?;
    tracing::info!(url = %request.url, platform, "[API] video info");

    let info = ctx
        .downloader
        .video_info(&request.url, platform)
        .await
        .map_err(|e| AppError::from_download(CONTEXT, e))?;

    Ok(Json(info))
}

async fn download(
    State(ctx): State<AppContext>,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    const CONTEXT: &str = "Download failed";
    let fail = |e: DownloadError| AppError::from_download(CONTEXT, e);

    platform::detect_platform(&request.url).map_err(fail)?;
    let quality = QualityTarget::parse(&request.quality).map_err(fail)?;
    let kind = FormatKind::parse(&request.format_type).map_err(fail)?;
    tracing::info!(url = %request.url, %quality, ?kind, "[API] download");

    let artifact = ctx
        .downloader
        .fetch(&request.url, quality, kind)
        .await
        .map_err(fail)?;

    file_response(&artifact).await
}

async fn debug_formats(
    State(ctx): State<AppContext>,
    Json(request): Json<VideoUrlRequest>,
) -> Result<Json<FormatDebugReport>, AppError> {
    const CONTEXT: &str = "Debug failed";

    platform::validate_url(&request.url).map_err(|e| {
        AppError::new(StatusCode::BAD_REQUEST, format!("{}: {}", CONTEXT, e))
    })?;

    let report = ctx
        .downloader
        .debug_formats(&request.url)
        .await
        .map_err(|e| AppError::from_download(CONTEXT, e))?;

    Ok(Json(report))
}

/// Stream the artifact from disk as an attachment
async fn file_response(artifact: &Artifact) -> Result<Response, AppError> {
    let file = tokio::fs::File::open(&artifact.path).await.map_err(|e| {
        tracing::error!("[API] cannot open {}: {}", artifact.path.display(), e);
        AppError::from_download("Download failed", DownloadError::ArtifactNotFound)
    })?;

    let disposition = HeaderValue::from_str(&content_disposition(&artifact.display_name))
        .map_err(|e| {
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid file name: {}", e),
            )
        })?;

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(artifact.size)),
        ],
        body,
    )
        .into_response())
}

/// `attachment` header with an ASCII fallback and the exact UTF-8 name
pub fn content_disposition(display_name: &str) -> String {
    let fallback: String = display_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(display_name)
    )
}
