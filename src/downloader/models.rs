// Common data models for the format pipeline
//
// Raw yt-dlp format records are parsed into EncodingDescriptor once, right
// after the probe. Every later stage (catalog, resolver, locator) works on
// these typed values instead of the raw JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::errors::DownloadError;

/// Canonical quality ladder, ascending
pub const CANONICAL_LADDER: [u32; 8] = [144, 240, 360, 480, 720, 1080, 1440, 2160];

/// Id sentinel some extractors report for every format
pub const AMBIGUOUS_ID: &str = "auto";

/// Container reported for a format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
    Mkv,
    /// Audio-only MPEG-4
    M4a,
    Mp3,
    Ogg,
    Unknown,
}

impl Container {
    pub fn from_ext(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Self::Mp4,
            "webm" => Self::Webm,
            "mkv" => Self::Mkv,
            "m4a" => Self::M4a,
            "mp3" => Self::Mp3,
            "ogg" | "opus" => Self::Ogg,
            _ => Self::Unknown,
        }
    }

    /// Containers accepted for the video ladder
    pub fn is_video_container(&self) -> bool {
        matches!(self, Self::Mp4 | Self::Webm | Self::Mkv)
    }

    /// Containers accepted for the audio catalog
    pub fn is_audio_container(&self) -> bool {
        matches!(self, Self::M4a | Self::Mp4 | Self::Webm | Self::Mp3 | Self::Ogg)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
            Self::M4a => "m4a",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Unknown => "unknown",
        }
    }
}

/// Presence marker for a video or audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecMarker {
    /// A real codec string (avc1.640028, opus, ...)
    Real(String),
    /// Explicit "none": the track is absent
    None,
    /// Placeholder value "auto": codec not known yet
    Auto,
    /// Field missing from the record
    Unspecified,
}

impl CodecMarker {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Unspecified,
            Some(v) if v.eq_ignore_ascii_case("none") => Self::None,
            Some(v) if v.eq_ignore_ascii_case("auto") => Self::Auto,
            Some(v) => Self::Real(v.to_string()),
        }
    }

    /// Anything but an explicit "none" may carry the track
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }

    /// Value as reported to clients
    pub fn as_reported(&self) -> Option<String> {
        match self {
            Self::Real(codec) => Some(codec.clone()),
            Self::None => Some("none".to_string()),
            Self::Auto => Some("auto".to_string()),
            Self::Unspecified => None,
        }
    }
}

/// How the format is delivered by the origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportProtocol {
    Http,
    Https,
    /// HLS/DASH style segmented delivery
    Fragmented,
    Other(String),
    Unspecified,
}

impl TransportProtocol {
    pub fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Unspecified;
        };
        let lower = raw.to_ascii_lowercase();
        match lower.as_str() {
            "http" => Self::Http,
            "https" => Self::Https,
            p if p.contains("m3u8")
                || p.contains("dash")
                || p.contains("frag")
                || p.contains("ism")
                || p.contains("f4m") =>
            {
                Self::Fragmented
            }
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Plain single-request transports that can be captured directly
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Http | Self::Https | Self::Unspecified)
    }
}

/// One reported or synthesized encoding
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingDescriptor {
    /// Selector token understood by the extraction tool
    pub id: String,
    pub container: Container,
    /// Extension exactly as reported
    pub ext: String,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    pub video_codec: CodecMarker,
    pub audio_codec: CodecMarker,
    /// Total bitrate in kbps
    pub bitrate: Option<f64>,
    pub protocol: TransportProtocol,
    pub file_size: Option<u64>,
    /// Synthesized ladder entry with no backing format
    pub placeholder: bool,
}

impl EncodingDescriptor {
    /// Parse one raw format record. Missing or oddly-typed fields become None.
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        let ext = raw["ext"].as_str().unwrap_or("").to_string();
        let height = raw["height"]
            .as_u64()
            .or_else(|| raw["height"].as_f64().map(|h| h.round() as u64))
            .and_then(|h| u32::try_from(h).ok())
            .filter(|h| *h > 0);

        Self {
            id: raw["format_id"].as_str().unwrap_or("").trim().to_string(),
            container: Container::from_ext(&ext),
            ext,
            height,
            fps: raw["fps"].as_f64().map(|fps| fps as f32),
            video_codec: CodecMarker::parse(raw["vcodec"].as_str()),
            audio_codec: CodecMarker::parse(raw["acodec"].as_str()),
            bitrate: raw["tbr"].as_f64(),
            protocol: TransportProtocol::parse(raw["protocol"].as_str()),
            file_size: raw["filesize"]
                .as_u64()
                .or_else(|| raw["filesize_approx"].as_u64()),
            placeholder: false,
        }
    }

    /// Ladder entry advertised when the source does not report this height
    pub fn placeholder(height: u32) -> Self {
        Self {
            id: format!("auto-{}", height),
            container: Container::Mp4,
            ext: "mp4".to_string(),
            height: Some(height),
            fps: None,
            video_codec: CodecMarker::Auto,
            audio_codec: CodecMarker::Auto,
            bitrate: None,
            protocol: TransportProtocol::Unspecified,
            file_size: None,
            placeholder: true,
        }
    }

    /// Quality label such as "720p"
    pub fn quality_label(&self) -> Option<String> {
        self.height.map(|h| format!("{}p", h))
    }

    pub fn has_video(&self) -> bool {
        self.height.is_some() && self.video_codec.is_present()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_present()
    }

    /// Id usable as a `-f` token: present and not the ambiguous sentinel
    pub fn has_selectable_id(&self) -> bool {
        !self.id.is_empty() && self.id != AMBIGUOUS_ID
    }

    /// Storyboard / thumbnail tracks (YouTube reports them as sb0, sb1, ...)
    pub fn is_storyboard(&self) -> bool {
        self.id.starts_with("sb")
    }
}

/// Media kind requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    #[default]
    Video,
    Audio,
}

impl FormatKind {
    pub fn parse(value: &str) -> Result<Self, DownloadError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(DownloadError::InvalidFormatType(other.to_string())),
        }
    }
}

/// Requested quality, parsed once from the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTarget {
    Height(u32),
    Best,
    Audio,
}

impl QualityTarget {
    pub fn parse(value: &str) -> Result<Self, DownloadError> {
        let trimmed = value.trim().to_ascii_lowercase();
        match trimmed.as_str() {
            "best" => return Ok(Self::Best),
            "audio" => return Ok(Self::Audio),
            _ => {}
        }

        trimmed
            .strip_suffix('p')
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|h| *h > 0)
            .map(Self::Height)
            .ok_or_else(|| DownloadError::InvalidQuality(value.to_string()))
    }

    /// Media kind actually produced: an `audio` quality always extracts audio
    pub fn kind_for(&self, requested: FormatKind) -> FormatKind {
        match self {
            Self::Audio => FormatKind::Audio,
            _ => requested,
        }
    }

    /// Label used in file names ("720p", "best", "audio")
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QualityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height(h) => write!(f, "{}p", h),
            Self::Best => write!(f, "best"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Resolver output, handed to the materializing call as `-f <expr>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPlan {
    /// Direct id of a format carrying both tracks
    Single(String),
    /// Video-only id merged with an audio fallback chain
    Composite { video_id: String, audio: String },
    /// Declarative fallback chain
    Fallback(String),
}

impl SelectorPlan {
    pub fn expression(&self) -> String {
        match self {
            Self::Single(id) => id.clone(),
            Self::Composite { video_id, audio } => format!("{}+{}", video_id, audio),
            Self::Fallback(expr) => expr.clone(),
        }
    }
}

impl fmt::Display for SelectorPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}

/// Materialized file ready to be streamed
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub display_name: String,
}

/// Result of the metadata probe
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<u64>,
    pub uploader: Option<String>,
    /// Format records exactly as reported
    pub raw_formats: Vec<serde_json::Value>,
}

impl ProbeResult {
    pub fn descriptors(&self) -> Vec<EncodingDescriptor> {
        self.raw_formats
            .iter()
            .map(EncodingDescriptor::from_raw)
            .collect()
    }
}

/// Format entry in the info response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOption {
    pub quality: String,
    pub format_id: String,
    pub ext: String,
    pub filesize: Option<u64>,
    pub fps: Option<f32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
}

impl FormatOption {
    pub fn from_descriptor(descriptor: &EncodingDescriptor, quality: String) -> Self {
        Self {
            quality,
            format_id: descriptor.id.clone(),
            ext: descriptor.ext.clone(),
            filesize: descriptor.file_size,
            fps: descriptor.fps,
            vcodec: descriptor.video_codec.as_reported(),
            acodec: descriptor.audio_codec.as_reported(),
        }
    }
}

/// Video information returned by /api/video/info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    pub duration: Option<u64>,
    pub uploader: String,
    pub platform: String,
    pub formats: Vec<FormatOption>,
    pub audio_formats: Vec<FormatOption>,
}

/// Raw view of one format for /api/debug/formats. Values are passed
/// through untouched, nulls included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDebugEntry {
    pub format_id: serde_json::Value,
    pub ext: serde_json::Value,
    pub quality: serde_json::Value,
    pub height: serde_json::Value,
    pub width: serde_json::Value,
    pub fps: serde_json::Value,
    pub vcodec: serde_json::Value,
    pub acodec: serde_json::Value,
    pub filesize: serde_json::Value,
    pub tbr: serde_json::Value,
    pub protocol: serde_json::Value,
}

impl FormatDebugEntry {
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        let field = |name: &str| raw.get(name).cloned().unwrap_or(serde_json::Value::Null);
        Self {
            format_id: field("format_id"),
            ext: field("ext"),
            quality: field("quality"),
            height: field("height"),
            width: field("width"),
            fps: field("fps"),
            vcodec: field("vcodec"),
            acodec: field("acodec"),
            filesize: field("filesize"),
            tbr: field("tbr"),
            protocol: field("protocol"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDebugReport {
    pub title: Option<String>,
    pub total_formats: usize,
    pub formats: Vec<FormatDebugEntry>,
}

/// Network configuration passed to the extraction tool
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// HTTP/SOCKS proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Path to a Netscape cookies.txt file
    pub cookies_path: Option<PathBuf>,

    /// Socket timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            cookies_path: None,
            timeout: Some(30),
        }
    }
}
