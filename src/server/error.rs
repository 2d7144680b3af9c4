// Error-to-HTTP conversion
//
// Bodies use the `{"detail": "..."}` shape the web front-end reads.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::downloader::DownloadError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    detail: String,
}

impl AppError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Map a pipeline error, prefixing upstream failures with `context`
    /// ("Download failed", "Failed to extract video info", ...)
    pub fn from_download(context: &str, err: DownloadError) -> Self {
        match err {
            DownloadError::InvalidUrl(_)
            | DownloadError::UnsupportedPlatform(_)
            | DownloadError::InvalidQuality(_)
            | DownloadError::InvalidFormatType(_) => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            DownloadError::ArtifactNotFound => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            other => {
                let status = if other.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                Self::new(status, format!("{}: {}", context, other))
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "Server error in API handler");
        } else {
            tracing::info!(status = %self.status, detail = %self.detail, "Request rejected");
        }

        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::extractors::BlockingReason;

    #[test]
    fn test_validation_errors_are_bare_400() {
        let err = AppError::from_download(
            "Download failed",
            DownloadError::UnsupportedPlatform("vimeo.com".into()),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "Unsupported platform");
    }

    #[test]
    fn test_upstream_errors_are_prefixed_400() {
        let err = AppError::from_download(
            "Download failed",
            DownloadError::DownloadFailed {
                detail: "Video unavailable".into(),
                reason: Some(BlockingReason::VideoUnavailable),
            },
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "Download failed: Video unavailable");
    }

    #[test]
    fn test_artifact_not_found_is_500() {
        let err = AppError::from_download("Download failed", DownloadError::ArtifactNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "Downloaded file not found. Please try again.");
    }

    #[test]
    fn test_missing_tool_is_500() {
        let err = AppError::from_download(
            "Failed to extract video info",
            DownloadError::ToolNotFound("yt-dlp".into()),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
