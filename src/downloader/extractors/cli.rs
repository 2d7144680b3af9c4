// CLI InfoExtractor - uses native `yt-dlp` binary
//
// Two calls per request:
// - probe: `--dump-json`, read-only
// - materialize: `-f <plan>` into the request's work directory, with
//   progress lines and the final path streamed from stdout

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc::UnboundedSender;

use super::diagnostics::{diagnose_error, summarize_stderr};
use super::progress::{parse_line, ProgressEvent, FINISHED_MARKER};
use super::traits::{InfoExtractor, MaterializeExit, MaterializeRequest};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{FormatKind, NetworkConfig, ProbeResult};
use crate::downloader::utils::{get_network_args, run_output_with_timeout, spawn_error};

/// Target bitrate for audio extraction
const AUDIO_QUALITY: &str = "192K";

/// CLI-based extractor using the yt-dlp binary
pub struct CliInfoExtractor {
    ytdlp_path: String,
    network: NetworkConfig,
    probe_timeout_secs: u64,
}

impl CliInfoExtractor {
    pub fn new(ytdlp_path: Option<String>, network: NetworkConfig, probe_timeout_secs: u64) -> Self {
        Self {
            ytdlp_path: ytdlp_path.unwrap_or_else(Self::find_ytdlp),
            network,
            probe_timeout_secs,
        }
    }

    /// Find yt-dlp binary
    fn find_ytdlp() -> String {
        let common_paths = [
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac / pip
            "/usr/bin/yt-dlp",          // System installation
        ];

        for path in common_paths {
            if Path::new(path).exists() {
                return path.to_string();
            }
        }

        which::which("yt-dlp")
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| "yt-dlp".to_string())
    }

    /// Build probe arguments
    fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(get_network_args(&self.network));
        args.push(url.to_string());
        args
    }

    /// Build materializing arguments
    fn materialize_args(&self, request: &MaterializeRequest) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            request.plan.expression(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-quiet".to_string(),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", FINISHED_MARKER),
            "-o".to_string(),
            request.output_template.clone(),
        ];

        match request.kind {
            FormatKind::Video => {
                args.extend([
                    "--merge-output-format".to_string(),
                    "mp4".to_string(),
                    "--recode-video".to_string(),
                    "mp4".to_string(),
                ]);
            }
            FormatKind::Audio => {
                args.extend([
                    "-x".to_string(),
                    "--audio-format".to_string(),
                    "mp3".to_string(),
                    "--audio-quality".to_string(),
                    AUDIO_QUALITY.to_string(),
                ]);
            }
        }

        args.extend(get_network_args(&self.network));
        args.push(request.url.clone());
        args
    }

    /// Parse `--dump-json` output
    fn parse_json(stdout: &[u8]) -> Result<ProbeResult, DownloadError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(json_str.trim())
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

        let raw_formats = match json["formats"].as_array() {
            Some(formats) => formats.clone(),
            // Single-format extractors put the format fields at the top level
            None if json["format_id"].is_string() => vec![json.clone()],
            None => Vec::new(),
        };

        Ok(ProbeResult {
            title: non_empty(json["title"].as_str()),
            thumbnail: non_empty(json["thumbnail"].as_str()),
            duration: json["duration"].as_f64().map(|d| d.round() as u64),
            uploader: non_empty(json["uploader"].as_str()),
            raw_formats,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl InfoExtractor for CliInfoExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    fn is_available(&self) -> bool {
        Path::new(&self.ytdlp_path).exists() || which::which(&self.ytdlp_path).is_ok()
    }

    async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        let args = self.probe_args(url);
        tracing::debug!("[CliExtractor] probe: {} {}", self.ytdlp_path, args.join(" "));

        let output = run_output_with_timeout(&self.ytdlp_path, args, self.probe_timeout_secs)
            .await
            .map_err(|e| match e {
                DownloadError::Timeout { seconds, .. } => DownloadError::Timeout {
                    stage: "metadata probe",
                    seconds,
                },
                other => other,
            })?;

        if output.status.success() {
            return Self::parse_json(&output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = diagnose_error(&stderr);
        tracing::warn!("[CliExtractor] probe failed ({:?}): {}", reason, stderr.trim());

        Err(DownloadError::ProbeFailed {
            detail: summarize_stderr(&stderr),
            reason,
        })
    }

    async fn materialize(
        &self,
        request: &MaterializeRequest,
        events: UnboundedSender<ProgressEvent>,
    ) -> Result<MaterializeExit, DownloadError> {
        let args = self.materialize_args(request);
        tracing::debug!("[CliExtractor] download: {} {}", self.ytdlp_path, args.join(" "));

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.ytdlp_path, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        // Collect stderr in the background so the pipe never fills up
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).to_string()
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Failed to read stdout: {}", e)))?
        {
            if let Some(event) = parse_line(&line) {
                if let Some(path) = event.path() {
                    tracing::debug!("[yt-dlp] output path {}", path.display());
                }
                // Receiver gone means nobody is watching; keep draining
                let _ = events.send(event);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Process error: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(MaterializeExit::Success)
        } else {
            Ok(MaterializeExit::Failed {
                stderr: stderr_output,
            })
        }
    }
}
