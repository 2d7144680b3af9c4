// Downloader module - format resolution and file materialization pipeline

pub mod catalog;
pub mod context;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod lifecycle;
pub mod locator;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod tools;
pub mod utils;

pub use catalog::Catalog;
pub use errors::DownloadError;
pub use extractors::{CliInfoExtractor, InfoExtractor};
pub use format_selector::FormatSelector;
pub use models::{
    Artifact, EncodingDescriptor, FormatKind, NetworkConfig, QualityTarget, SelectorPlan,
    VideoInfo,
};
pub use orchestrator::{Downloader, DownloaderConfig};
pub use retry::RetryPolicy;
pub use tools::ToolManager;
