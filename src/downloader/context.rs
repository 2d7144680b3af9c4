// Per-request context - identity, work directory and output naming
//
// Every download gets its own directory under the temp root, so concurrent
// requests for the same title and quality never see each other's files.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::errors::DownloadError;
use super::models::{FormatKind, QualityTarget};

/// Prefix of every file the pipeline writes
pub const FILE_PREFIX: &str = "framefetch_";

/// Max title characters kept in file names
const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: Uuid,
    pub work_dir: PathBuf,
    pub quality: QualityTarget,
    pub kind: FormatKind,
}

impl RequestContext {
    /// Allocate an id and create `<temp_root>/framefetch-<id>/`
    pub async fn create(
        temp_root: &Path,
        quality: QualityTarget,
        kind: FormatKind,
    ) -> Result<Self, DownloadError> {
        let id = Uuid::new_v4();
        let work_dir = temp_root.join(format!("framefetch-{}", id));
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| DownloadError::io(&work_dir, e))?;

        Ok(Self {
            id,
            work_dir,
            quality,
            kind,
        })
    }

    /// Label embedded in file names
    pub fn quality_label(&self) -> String {
        self.quality.label()
    }

    /// Extension the materializing call is forced into
    pub fn target_ext(&self) -> &'static str {
        match self.kind {
            FormatKind::Video => "mp4",
            FormatKind::Audio => "mp3",
        }
    }

    /// yt-dlp output template rooted in the work directory
    pub fn output_template(&self, title: &str) -> String {
        let name = format!(
            "{}{}_{}.%(ext)s",
            FILE_PREFIX,
            sanitize_title(title),
            self.quality_label()
        );
        self.work_dir.join(name).to_string_lossy().to_string()
    }
}

/// Make a title safe for a file name and for a yt-dlp template
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(TITLE_MAX_CHARS)
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();

    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        return "video".to_string();
    }

    // Template syntax: a literal percent is written as %%
    cleaned.replace('%', "%%")
}
