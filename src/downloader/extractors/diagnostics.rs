// Failure diagnostics - why yt-dlp gave up on a URL
//
// The diagnosed reason decides whether the metadata probe is worth
// repeating and gives the client a readable explanation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 from the media host
    Http403Forbidden,
    AgeRestricted,
    GeoBlocked,
    /// Socket-level timeout or refused connection
    NetworkTimeout,
    /// HTTP 429 or an explicit throttling notice
    RateLimited,
    /// "confirm you're not a bot" / captcha walls
    BotDetection,
    PrivateVideo,
    /// Removed, deleted or never existed
    VideoUnavailable,
    DrmProtected,
    /// The selector matched none of the reported formats
    FormatUnavailable,
    /// No yt-dlp extractor handles the URL
    UnsupportedUrl,
    Unknown,
}

impl BlockingReason {
    /// Repeating the same probe later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
                | Self::Unknown
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::RateLimited => "Rate limited by the platform",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::FormatUnavailable => "Requested format is not available",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::Unknown => "Unknown error",
        }
    }
}

/// Stderr fragments per reason, most specific first. Matching is
/// case-insensitive and the first hit wins.
const SIGNATURES: &[(BlockingReason, &[&str])] = &[
    (
        BlockingReason::DrmProtected,
        &["drm", "widevine", "playready", "fairplay", "encrypted media"],
    ),
    (BlockingReason::UnsupportedUrl, &["unsupported url"]),
    (
        BlockingReason::FormatUnavailable,
        &["requested format is not available"],
    ),
    (
        BlockingReason::AgeRestricted,
        &["age-restricted", "sign in to confirm your age", "age_verification"],
    ),
    (
        BlockingReason::PrivateVideo,
        &["private video", "video is private", "sign in if you've been granted access"],
    ),
    (
        BlockingReason::VideoUnavailable,
        &[
            "video unavailable",
            "video is unavailable",
            "video has been removed",
            "no longer available",
        ],
    ),
    (
        BlockingReason::GeoBlocked,
        &["not available in your country", "blocked in your country", "geo restrict", "geo-restrict"],
    ),
    (
        BlockingReason::RateLimited,
        &["429", "too many requests", "rate limit", "rate-limit"],
    ),
    (
        BlockingReason::BotDetection,
        &["not a bot", "captcha", "unusual traffic"],
    ),
    (BlockingReason::Http403Forbidden, &["403", "forbidden"]),
    (
        BlockingReason::NetworkTimeout,
        &["timed out", "timeout", "connection refused", "network is unreachable", "network unreachable"],
    ),
];

/// Diagnose a yt-dlp failure. Unrecognised non-empty output is `Unknown`;
/// empty output yields `None`.
pub fn diagnose_error(stderr: &str) -> Option<BlockingReason> {
    if stderr.trim().is_empty() {
        return None;
    }

    let lower = stderr.to_lowercase();
    let reason = SIGNATURES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(reason, _)| *reason)
        .unwrap_or(BlockingReason::Unknown);

    Some(reason)
}

/// Most useful line of a yt-dlp stderr dump, for error details
pub fn summarize_stderr(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:") || l.contains("HTTP Error"))
        .take(2)
        .collect();

    if !important.is_empty() {
        return important
            .iter()
            .map(|l| l.strip_prefix("ERROR:").unwrap_or(l).trim())
            .collect::<Vec<_>>()
            .join(" | ");
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.chars().take(300).collect())
        .unwrap_or_else(|| "yt-dlp exited without output".to_string())
}
