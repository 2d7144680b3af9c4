// InfoExtractor trait and common types

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::progress::ProgressEvent;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{FormatKind, ProbeResult, SelectorPlan};

/// Everything the tool needs to materialize one file
#[derive(Debug, Clone)]
pub struct MaterializeRequest {
    pub url: String,
    pub plan: SelectorPlan,
    /// Output template inside the request's work directory
    pub output_template: String,
    pub kind: FormatKind,
}

/// How the materializing process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeExit {
    Success,
    Failed { stderr: String },
}

/// Trait for extraction backends
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Check if this extractor is available
    fn is_available(&self) -> bool;

    /// Fetch metadata and the raw format list
    async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError>;

    /// Produce the file described by `request`, reporting progress on `events`.
    ///
    /// A non-zero exit is returned as `MaterializeExit::Failed`; `Err` is
    /// reserved for failures to run the tool at all.
    async fn materialize(
        &self,
        request: &MaterializeRequest,
        events: UnboundedSender<ProgressEvent>,
    ) -> Result<MaterializeExit, DownloadError>;
}
