// Orchestrator - probe, resolve, materialize, locate, finalize
//
// One Downloader is shared by all requests. Per-request state lives in a
// RequestContext; nothing here is mutated after construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Instrument;

use super::catalog::Catalog;
use super::context::RequestContext;
use super::errors::DownloadError;
use super::extractors::{
    diagnose_error, summarize_stderr, InfoExtractor, MaterializeExit, MaterializeRequest,
    PathTracker, ProgressEvent,
};
use super::format_selector::FormatSelector;
use super::lifecycle;
use super::locator::{self, LocateQuery};
use super::models::{
    Artifact, FormatDebugEntry, FormatDebugReport, FormatKind, ProbeResult, QualityTarget,
    VideoInfo,
};
use super::retry::{classify_error, RetryDecision, RetryPolicy};

/// Pipeline settings, fixed at startup
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Parent of the per-request work directories
    pub temp_root: PathBuf,
    pub download_timeout: Duration,
    /// Delay before a served file is deleted
    pub cleanup_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            download_timeout: Duration::from_secs(900),
            cleanup_delay: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct Downloader {
    extractor: Arc<dyn InfoExtractor>,
    config: DownloaderConfig,
}

impl Downloader {
    pub fn new(extractor: Arc<dyn InfoExtractor>, config: DownloaderConfig) -> Self {
        Self { extractor, config }
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    pub fn extractor_available(&self) -> bool {
        self.extractor.is_available()
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Metadata probe with bounded retry for transient failures
    pub async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        let mut attempt = 1;

        loop {
            let err = match self.extractor.probe(url).await {
                Ok(result) => {
                    tracing::debug!(
                        attempt,
                        formats = result.raw_formats.len(),
                        "[Orchestrator] probe ok"
                    );
                    return Ok(result);
                }
                Err(e) => e,
            };

            match self.config.retry.should_retry(classify_error(&err), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "[Orchestrator] probe failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    tracing::warn!(attempt, %reason, "[Orchestrator] probe failed: {}", err);
                    return Err(err);
                }
            }
        }
    }

    /// Info response: video ladder plus the audio catalog
    pub async fn video_info(&self, url: &str, platform: &str) -> Result<VideoInfo, DownloadError> {
        let probe = self.probe(url).await?;
        let descriptors = probe.descriptors();

        let video = Catalog::normalize(&descriptors, FormatKind::Video);
        let audio = Catalog::normalize(&descriptors, FormatKind::Audio);
        tracing::info!(
            reported = descriptors.len(),
            video = video.len(),
            audio = audio.len(),
            "[Orchestrator] catalog built"
        );

        Ok(VideoInfo {
            title: probe.title.unwrap_or_else(|| "Unknown Title".to_string()),
            thumbnail: probe.thumbnail.unwrap_or_default(),
            duration: probe.duration,
            uploader: probe.uploader.unwrap_or_else(|| "Unknown".to_string()),
            platform: platform.to_string(),
            formats: video.to_options(),
            audio_formats: audio.to_options(),
        })
    }

    /// Every reported format, untouched
    pub async fn debug_formats(&self, url: &str) -> Result<FormatDebugReport, DownloadError> {
        let probe = self.probe(url).await?;
        let formats: Vec<FormatDebugEntry> = probe
            .raw_formats
            .iter()
            .map(FormatDebugEntry::from_raw)
            .collect();

        Ok(FormatDebugReport {
            title: probe.title,
            total_formats: formats.len(),
            formats,
        })
    }

    /// Full download pipeline. On success the artifact is scheduled for
    /// deletion; on failure or cancellation everything the request wrote
    /// is removed.
    pub async fn fetch(
        &self,
        url: &str,
        quality: QualityTarget,
        kind: FormatKind,
    ) -> Result<Artifact, DownloadError> {
        let kind = quality.kind_for(kind);
        let probe = self.probe(url).await?;
        let descriptors = probe.descriptors();
        let plan = FormatSelector::resolve(&descriptors, quality, kind);

        let ctx = RequestContext::create(&self.config.temp_root, quality, kind).await?;
        let guard = lifecycle::WorkDirGuard::new(ctx.work_dir.clone());
        let span = tracing::info_span!("download", request_id = %ctx.id);

        async {
            tracing::info!(
                %quality,
                ?kind,
                selector = %plan,
                "[Orchestrator] resolved selector"
            );

            let title = probe.title.as_deref().unwrap_or("video");
            let request = MaterializeRequest {
                url: url.to_string(),
                plan,
                output_template: ctx.output_template(title),
                kind,
            };

            let (result, captured) = self.materialize(&ctx, &request).await;
            match result {
                Ok(artifact) => {
                    tracing::info!(
                        path = %artifact.path.display(),
                        size = artifact.size,
                        "[Orchestrator] artifact ready"
                    );
                    lifecycle::schedule_deletion(
                        artifact.path.clone(),
                        ctx.work_dir.clone(),
                        self.config.cleanup_delay,
                    );
                    guard.disarm();
                    Ok(artifact)
                }
                Err(e) => {
                    tracing::warn!(
                        reason = e.blocking_reason().map(|r| r.description()),
                        "[Orchestrator] download failed: {}",
                        e
                    );
                    lifecycle::purge(captured.as_deref(), &ctx.work_dir).await;
                    guard.disarm();
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the materializing call and find its output. The captured path is
    /// returned even on failure so the caller can clean it up.
    async fn materialize(
        &self,
        ctx: &RequestContext,
        request: &MaterializeRequest,
    ) -> (Result<Artifact, DownloadError>, Option<PathBuf>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();

        let run = timeout(
            self.config.download_timeout,
            self.extractor.materialize(request, tx),
        );
        let drain = async {
            let mut tracker = PathTracker::default();
            while let Some(event) = rx.recv().await {
                if let ProgressEvent::Progress { status, .. } = &event {
                    tracing::trace!("[Orchestrator] {}", status);
                }
                tracker.observe(&event);
            }
            tracker
        };

        // The sender lives inside `run`, so the drain ends when it does
        let (outcome, tracker) = tokio::join!(run, drain);
        let captured = tracker.captured();

        let result = match outcome {
            Err(_) => Err(DownloadError::Timeout {
                stage: "download",
                seconds: self.config.download_timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(e),
            Ok(Ok(MaterializeExit::Failed { stderr })) => Err(DownloadError::DownloadFailed {
                detail: summarize_stderr(&stderr),
                reason: diagnose_error(&stderr),
            }),
            Ok(Ok(MaterializeExit::Success)) => {
                tracing::debug!(
                    captured = ?captured,
                    last_percent = tracker.last_percent(),
                    "[Orchestrator] yt-dlp exited cleanly"
                );
                self.locate_artifact(ctx, captured.as_deref()).await
            }
        };

        (result, captured)
    }

    async fn locate_artifact(
        &self,
        ctx: &RequestContext,
        captured: Option<&Path>,
    ) -> Result<Artifact, DownloadError> {
        let quality_label = ctx.quality_label();
        let query = LocateQuery {
            captured,
            dir: &ctx.work_dir,
            quality_label: &quality_label,
            target_ext: ctx.target_ext(),
        };

        let located = locator::locate(&query, SystemTime::now()).await?;
        tracing::debug!(tier = ?located.tier, "[Locator] found {}", located.path.display());
        lifecycle::finalize(&located.path).await
    }
}
