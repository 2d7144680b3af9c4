// Error types for the download pipeline

use std::path::PathBuf;

use thiserror::Error;

use super::extractors::BlockingReason;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Not an absolute http(s) URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform")]
    UnsupportedPlatform(String),

    #[error("Invalid quality: {0}")]
    InvalidQuality(String),

    #[error("Invalid format type: {0}")]
    InvalidFormatType(String),

    /// yt-dlp (or ffmpeg) not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Metadata probe exited with an error
    #[error("{detail}")]
    ProbeFailed {
        detail: String,
        reason: Option<BlockingReason>,
    },

    /// Materializing download exited with an error
    #[error("{detail}")]
    DownloadFailed {
        detail: String,
        reason: Option<BlockingReason>,
    },

    /// External call exceeded its time budget
    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    /// Download reported success but no usable file exists
    #[error("Downloaded file not found. Please try again.")]
    ArtifactNotFound,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Input or upstream failures the client can act on
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::ArtifactNotFound | Self::Io { .. } | Self::ToolNotFound(_)
        )
    }

    /// Diagnosed blocking reason, if any
    pub fn blocking_reason(&self) -> Option<BlockingReason> {
        match self {
            Self::ProbeFailed { reason, .. } | Self::DownloadFailed { reason, .. } => *reason,
            Self::Timeout { .. } => Some(BlockingReason::NetworkTimeout),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_split() {
        assert!(DownloadError::UnsupportedPlatform("x".into()).is_client_error());
        assert!(DownloadError::DownloadFailed {
            detail: "boom".into(),
            reason: None
        }
        .is_client_error());
        assert!(!DownloadError::ArtifactNotFound.is_client_error());
    }

    #[test]
    fn test_blocking_reason() {
        let err = DownloadError::ProbeFailed {
            detail: "HTTP Error 429".into(),
            reason: Some(BlockingReason::RateLimited),
        };
        assert_eq!(err.blocking_reason(), Some(BlockingReason::RateLimited));
        assert_eq!(
            DownloadError::Timeout { stage: "download", seconds: 5 }.blocking_reason(),
            Some(BlockingReason::NetworkTimeout)
        );
        assert_eq!(DownloadError::ArtifactNotFound.blocking_reason(), None);
    }
}
