// Artifact Locator - finds the file a finished download actually produced
//
// Tiers, first hit wins:
// 1. Path captured from the finished event, if it exists
// 2. framefetch_*_<quality>.<target ext>, most recent
// 3. framefetch_*_<quality>.*, most recent
// 4. any framefetch_* created in the last 300s, most recent
//
// Searches only look inside the request's work directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::context::FILE_PREFIX;
use super::errors::DownloadError;

/// Window for the last-resort search
pub const RECENT_WINDOW: Duration = Duration::from_secs(300);

/// Leftovers of unfinished downloads
const PARTIAL_EXTENSIONS: [&str; 3] = ["part", "ytdl", "temp"];

/// Which tier produced the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateTier {
    Captured,
    TargetContainer,
    AnyContainer,
    Recent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub tier: LocateTier,
}

/// Search parameters for one request
#[derive(Debug, Clone)]
pub struct LocateQuery<'a> {
    pub captured: Option<&'a Path>,
    pub dir: &'a Path,
    pub quality_label: &'a str,
    pub target_ext: &'a str,
}

struct Candidate {
    path: PathBuf,
    stem: String,
    ext: String,
    created: SystemTime,
}

pub async fn locate(query: &LocateQuery<'_>, now: SystemTime) -> Result<Located, DownloadError> {
    if let Some(path) = query.captured {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Located {
                path: path.to_path_buf(),
                tier: LocateTier::Captured,
            });
        }
        tracing::debug!("[Locator] captured path {} is gone", path.display());
    }

    let candidates = scan(query.dir).await;
    let suffix = format!("_{}", query.quality_label);
    let pattern_matches: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.stem.ends_with(&suffix))
        .collect();

    let target = pattern_matches
        .iter()
        .copied()
        .filter(|c| c.ext.eq_ignore_ascii_case(query.target_ext));
    if let Some(found) = most_recent(target) {
        return Ok(Located {
            path: found.path.clone(),
            tier: LocateTier::TargetContainer,
        });
    }

    if let Some(found) = most_recent(pattern_matches.iter().copied()) {
        return Ok(Located {
            path: found.path.clone(),
            tier: LocateTier::AnyContainer,
        });
    }

    let recent = candidates.iter().filter(|c| match now.duration_since(c.created) {
        Ok(age) => age <= RECENT_WINDOW,
        // Clock skew: created "after" now still counts as recent
        Err(_) => true,
    });
    if let Some(found) = most_recent(recent) {
        return Ok(Located {
            path: found.path.clone(),
            tier: LocateTier::Recent,
        });
    }

    Err(DownloadError::ArtifactNotFound)
}

fn most_recent<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Option<&'a Candidate> {
    candidates.max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)))
}

/// Finished, non-empty framefetch_ files in `dir`
async fn scan(dir: &Path) -> Vec<Candidate> {
    let mut found = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("[Locator] cannot read {}: {}", dir.display(), e);
            return found;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(FILE_PREFIX) {
            continue;
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), ext.to_string()),
            None => (name.to_string(), String::new()),
        };
        if PARTIAL_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)) {
            continue;
        }

        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() || meta.len() == 0 {
            continue;
        }

        // Not every filesystem records birth time
        let Ok(created) = meta.created().or_else(|_| meta.modified()) else {
            continue;
        };

        found.push(Candidate {
            path,
            stem,
            ext,
            created,
        });
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        // Keep creation times strictly ordered
        std::thread::sleep(Duration::from_millis(15));
        path
    }

    fn query<'a>(dir: &'a Path, captured: Option<&'a Path>) -> LocateQuery<'a> {
        LocateQuery {
            captured,
            dir,
            quality_label: "720p",
            target_ext: "mp4",
        }
    }

    #[tokio::test]
    async fn test_captured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let captured = write(dir.path(), "renamed.mkv", b"data");
        write(dir.path(), "framefetch_Clip_720p.mp4", b"data");

        let located = locate(&query(dir.path(), Some(&captured)), SystemTime::now())
            .await
            .unwrap();
        assert_eq!(located.path, captured);
        assert_eq!(located.tier, LocateTier::Captured);
    }

    #[tokio::test]
    async fn test_missing_capture_falls_back_to_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("framefetch_Clip_720p.f136.mp4");
        let webm = write(dir.path(), "framefetch_Clip_720p.webm", b"data");
        let mp4 = write(dir.path(), "framefetch_Clip_720p.mp4", b"data");
        write(dir.path(), "framefetch_Clip_720p.webm.part", b"data");

        let located = locate(&query(dir.path(), Some(&gone)), SystemTime::now())
            .await
            .unwrap();
        assert_eq!(located.path, mp4);
        assert_eq!(located.tier, LocateTier::TargetContainer);

        fs::remove_file(&mp4).unwrap();
        let located = locate(&query(dir.path(), None), SystemTime::now()).await.unwrap();
        assert_eq!(located.path, webm);
        assert_eq!(located.tier, LocateTier::AnyContainer);
    }

    #[tokio::test]
    async fn test_most_recent_pattern_match() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "framefetch_Old_720p.mp4", b"old");
        let newer = write(dir.path(), "framefetch_New_720p.mp4", b"new");

        let located = locate(&query(dir.path(), None), SystemTime::now()).await.unwrap();
        assert_eq!(located.path, newer);
    }

    #[tokio::test]
    async fn test_other_quality_only_via_recent_window() {
        let dir = tempfile::tempdir().unwrap();
        let other = write(dir.path(), "framefetch_Clip_480p.mp4", b"data");

        let located = locate(&query(dir.path(), None), SystemTime::now()).await.unwrap();
        assert_eq!(located.path, other);
        assert_eq!(located.tier, LocateTier::Recent);

        let later = SystemTime::now() + Duration::from_secs(400);
        assert!(matches!(
            locate(&query(dir.path(), None), later).await,
            Err(DownloadError::ArtifactNotFound)
        ));
    }

    #[tokio::test]
    async fn test_ignores_partial_empty_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "framefetch_Clip_720p.mp4.part", b"data");
        write(dir.path(), "framefetch_Clip_720p.mp4.ytdl", b"data");
        write(dir.path(), "framefetch_Clip_720p.mp4", b"");
        write(dir.path(), "someone_else_720p.mp4", b"data");

        assert!(matches!(
            locate(&query(dir.path(), None), SystemTime::now()).await,
            Err(DownloadError::ArtifactNotFound)
        ));
    }

    #[tokio::test]
    async fn test_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(matches!(
            locate(&query(&gone, None), SystemTime::now()).await,
            Err(DownloadError::ArtifactNotFound)
        ));
    }
}
