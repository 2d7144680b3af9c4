// Lifecycle Manager - verification, deferred deletion and failure cleanup
//
// Cleanup is best-effort: every removal error is logged and swallowed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::context::FILE_PREFIX;
use super::errors::DownloadError;
use super::models::Artifact;

/// Verify the located file and derive its user-facing name
pub async fn finalize(path: &Path) -> Result<Artifact, DownloadError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(DownloadError::ArtifactNotFound),
        Err(e) => return Err(DownloadError::io(path, e)),
    };

    if !meta.is_file() || meta.len() == 0 {
        tracing::warn!("[Lifecycle] {} is empty or not a file", path.display());
        return Err(DownloadError::ArtifactNotFound);
    }

    Ok(Artifact {
        path: path.to_path_buf(),
        size: meta.len(),
        display_name: display_name(path),
    })
}

/// File name without the internal prefix
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());

    match name.strip_prefix(FILE_PREFIX) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => name,
    }
}

/// Remove the artifact after `delay`, then its work directory if empty
pub fn schedule_deletion(path: PathBuf, work_dir: PathBuf, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("[Cleanup] removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("[Cleanup] failed to remove {}: {}", path.display(), e),
        }

        // Fails harmlessly when something else is still inside
        match tokio::fs::remove_dir(&work_dir).await {
            Ok(()) => tracing::debug!("[Cleanup] removed {}", work_dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::debug!("[Cleanup] kept {}: {}", work_dir.display(), e),
        }
    })
}

/// Drop everything a failed request left behind
pub async fn purge(captured: Option<&Path>, work_dir: &Path) {
    if let Some(path) = captured {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!("[Cleanup] removed partial {}", path.display()),
                Err(e) => tracing::warn!("[Cleanup] failed to remove {}: {}", path.display(), e),
            }
        }
    }

    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => tracing::debug!("[Cleanup] removed {}", work_dir.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("[Cleanup] failed to remove {}: {}", work_dir.display(), e),
    }
}

/// Removes a request's work directory unless disarmed. Covers requests
/// abandoned mid-flight, where the future is dropped before any cleanup
/// branch runs.
pub struct WorkDirGuard {
    work_dir: Option<PathBuf>,
}

impl WorkDirGuard {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir: Some(work_dir),
        }
    }

    /// Cleanup is now owned by a scheduled deletion or an explicit purge
    pub fn disarm(mut self) {
        self.work_dir = None;
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        let Some(work_dir) = self.work_dir.take() else {
            return;
        };
        tracing::debug!("[Cleanup] request abandoned, removing {}", work_dir.display());

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { purge(None, &work_dir).await });
            }
            Err(_) => match std::fs::remove_dir_all(&work_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("[Cleanup] failed to remove {}: {}", work_dir.display(), e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_display_name() {
        assert_eq!(
            display_name(Path::new("/tmp/x/framefetch_My Clip_720p.mp4")),
            "My Clip_720p.mp4"
        );
        assert_eq!(display_name(Path::new("/tmp/x/other.mp4")), "other.mp4");
        assert_eq!(display_name(Path::new("/tmp/x/framefetch_")), "framefetch_");
    }

    #[tokio::test]
    async fn test_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framefetch_Clip_720p.mp4");
        fs::write(&path, b"12345").unwrap();

        let artifact = finalize(&path).await.unwrap();
        assert_eq!(artifact.size, 5);
        assert_eq!(artifact.display_name, "Clip_720p.mp4");
    }

    #[tokio::test]
    async fn test_finalize_rejects_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("framefetch_Empty_720p.mp4");
        fs::write(&empty, b"").unwrap();

        assert!(matches!(finalize(&empty).await, Err(DownloadError::ArtifactNotFound)));
        assert!(matches!(
            finalize(&dir.path().join("missing.mp4")).await,
            Err(DownloadError::ArtifactNotFound)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_deletion_waits() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("framefetch-req");
        fs::create_dir(&work_dir).unwrap();
        let path = work_dir.join("framefetch_Clip_720p.mp4");
        fs::write(&path, b"data").unwrap();

        let handle = schedule_deletion(path.clone(), work_dir.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(path.exists());

        handle.await.unwrap();
        assert!(!path.exists());
        assert!(!work_dir.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_deletion_tolerates_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("framefetch-req");
        let handle = schedule_deletion(
            work_dir.join("gone.mp4"),
            work_dir.clone(),
            Duration::from_secs(1),
        );
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_removes_capture_and_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("framefetch-req");
        fs::create_dir(&work_dir).unwrap();
        let partial = work_dir.join("framefetch_Clip_720p.f136.mp4");
        fs::write(&partial, b"half").unwrap();
        fs::write(work_dir.join("framefetch_Clip_720p.f140.m4a.part"), b"half").unwrap();

        purge(Some(&partial), &work_dir).await;

        assert!(!partial.exists());
        assert!(!work_dir.exists());

        // Second purge is a no-op
        purge(Some(&partial), &work_dir).await;
    }

    #[test]
    fn test_guard_removes_work_dir_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("framefetch-req");
        fs::create_dir(&work_dir).unwrap();
        fs::write(work_dir.join("framefetch_Clip_720p.f22.mp4.part"), b"half").unwrap();

        drop(WorkDirGuard::new(work_dir.clone()));
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_disarmed_guard_keeps_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("framefetch-req");
        fs::create_dir(&work_dir).unwrap();

        WorkDirGuard::new(work_dir.clone()).disarm();
        assert!(work_dir.exists());
    }
}
