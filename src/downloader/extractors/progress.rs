// Progress events parsed from yt-dlp stdout
//
// The materializing call runs yt-dlp with `--newline` and a
// `--print after_move:` template, so every interesting line is one of:
// - a percent progress line
// - a destination / merge / already-downloaded notice (path hints)
// - the final path, prefixed with FINISHED_MARKER

use std::path::PathBuf;

use regex::Regex;

/// Prefix printed by yt-dlp once the final file is in place
pub const FINISHED_MARKER: &str = "framefetch:finished:";

/// One observation from a running download
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Progress { percent: f32, status: String },
    /// Output file opened for writing
    Destination(PathBuf),
    /// Streams are being merged into this file
    Merging(PathBuf),
    /// File from a previous run was reused
    AlreadyDownloaded(PathBuf),
    /// Final path after all post-processing
    Finished(PathBuf),
}

impl ProgressEvent {
    /// Path this event points at, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Progress { .. } => None,
            Self::Destination(p)
            | Self::Merging(p)
            | Self::AlreadyDownloaded(p)
            | Self::Finished(p) => Some(p),
        }
    }
}

/// Parse yt-dlp output line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
pub fn parse_line(line: &str) -> Option<ProgressEvent> {
    lazy_static::lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+/s))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r#"\[Merger?\]\s+Merging formats into\s+"(.+)""#).unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"\[download\]\s+(.+?) has already been downloaded").unwrap();
        static ref EXTRACT_RE: Regex = Regex::new(r"\[ExtractAudio\]\s+Destination:\s+(.+)").unwrap();
        static ref RECODE_RE: Regex = Regex::new(r"\[VideoConvertor\]\s+Converting video from \S+ to \S+;\s+Destination:\s+(.+)").unwrap();
        static ref NO_RECODE_RE: Regex = Regex::new(r#"\[VideoConvertor\]\s+Not converting media file "(.+?)""#).unwrap();
    }

    let line = line.trim_end();

    if let Some(path) = line.strip_prefix(FINISHED_MARKER) {
        let path = path.trim();
        return (!path.is_empty()).then(|| ProgressEvent::Finished(PathBuf::from(path)));
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str());
        let eta = caps.get(4).map(|m| m.as_str());

        let mut status = format!("{:.1}% of {}", percent, size);
        if let Some(speed) = speed {
            status.push_str(&format!(" @ {}", speed));
        }
        if let Some(eta) = eta {
            status.push_str(&format!(" ETA {}", eta));
        }
        if let (Some(fc), Some(ft)) = (caps.get(5), caps.get(6)) {
            status.push_str(&format!(" (frag {}/{})", fc.as_str(), ft.as_str()));
        }

        return Some(ProgressEvent::Progress { percent, status });
    }

    if let Some(caps) = DEST_RE.captures(line).or_else(|| EXTRACT_RE.captures(line)) {
        return Some(ProgressEvent::Destination(PathBuf::from(caps.get(1)?.as_str().trim())));
    }

    if let Some(caps) = MERGE_RE
        .captures(line)
        .or_else(|| RECODE_RE.captures(line))
        .or_else(|| NO_RECODE_RE.captures(line))
    {
        return Some(ProgressEvent::Merging(PathBuf::from(caps.get(1)?.as_str().trim())));
    }

    if let Some(caps) = ALREADY_RE.captures(line) {
        return Some(ProgressEvent::AlreadyDownloaded(PathBuf::from(
            caps.get(1)?.as_str().trim(),
        )));
    }

    None
}

/// Tracks the best known output path while events arrive
#[derive(Debug, Default, Clone)]
pub struct PathTracker {
    finished: Option<PathBuf>,
    hint: Option<PathBuf>,
    last_percent: f32,
}

impl PathTracker {
    pub fn observe(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Progress { percent, .. } => self.last_percent = *percent,
            ProgressEvent::Finished(p) => self.finished = Some(p.clone()),
            ProgressEvent::Destination(p)
            | ProgressEvent::Merging(p)
            | ProgressEvent::AlreadyDownloaded(p) => self.hint = Some(p.clone()),
        }
    }

    /// The finished path wins over intermediate hints
    pub fn captured(&self) -> Option<PathBuf> {
        self.finished.clone().or_else(|| self.hint.clone())
    }

    pub fn last_percent(&self) -> f32 {
        self.last_percent
    }
}
