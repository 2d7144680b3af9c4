// Extractor module - the external extraction capability
//
// The pipeline only talks to the InfoExtractor trait:
// - probe: read-only metadata and raw format list
// - materialize: download/transcode with streamed progress events
//
// CliInfoExtractor is the production implementation on top of yt-dlp.

mod cli;
mod diagnostics;
mod progress;
mod traits;

pub use cli::CliInfoExtractor;
pub use diagnostics::{diagnose_error, summarize_stderr, BlockingReason};
pub use progress::{parse_line, PathTracker, ProgressEvent, FINISHED_MARKER};
pub use traits::{InfoExtractor, MaterializeExit, MaterializeRequest};
