// Server configuration - command line flags with environment fallbacks

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::downloader::{DownloaderConfig, NetworkConfig, RetryPolicy};

/// Origins always allowed by CORS
const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];
const PRODUCTION_ORIGINS: [&str; 2] = ["https://fetch-vid.vercel.app", "https://fetchvid.vercel.app"];

#[derive(Debug, Clone, Parser)]
#[command(name = "framefetch")]
#[command(version, about = "Video download API: format resolution and file delivery")]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Front-end origin allowed by CORS
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Parent directory for per-request work directories
    #[arg(long, env = "FRAMEFETCH_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// yt-dlp binary (auto-detected when unset)
    #[arg(long, env = "YTDLP_PATH")]
    pub ytdlp_path: Option<String>,

    /// HTTP/SOCKS proxy for yt-dlp
    #[arg(long, env = "FRAMEFETCH_PROXY")]
    pub proxy: Option<String>,

    /// Netscape cookies.txt handed to yt-dlp
    #[arg(long, env = "FRAMEFETCH_COOKIES")]
    pub cookies: Option<PathBuf>,

    /// yt-dlp socket timeout, seconds
    #[arg(long, env = "FRAMEFETCH_SOCKET_TIMEOUT", default_value_t = 30)]
    pub socket_timeout: u32,

    /// Metadata probe budget, seconds
    #[arg(long, env = "FRAMEFETCH_PROBE_TIMEOUT", default_value_t = 60)]
    pub probe_timeout: u64,

    /// Materializing download budget, seconds
    #[arg(long, env = "FRAMEFETCH_DOWNLOAD_TIMEOUT", default_value_t = 900)]
    pub download_timeout: u64,

    /// Probe attempts, including the first
    #[arg(long, env = "FRAMEFETCH_PROBE_ATTEMPTS", default_value_t = 3)]
    pub probe_attempts: u32,

    /// Delay before a served file is deleted, seconds
    #[arg(long, env = "FRAMEFETCH_CLEANUP_DELAY", default_value_t = 60)]
    pub cleanup_delay: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Dev and production origins plus FRONTEND_URL, without duplicates
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEV_ORIGINS
            .iter()
            .chain(PRODUCTION_ORIGINS.iter())
            .map(|o| o.to_string())
            .collect();

        let frontend = self.frontend_url.trim().trim_end_matches('/');
        if !frontend.is_empty() && !origins.iter().any(|o| o == frontend) {
            origins.push(frontend.to_string());
        }

        origins
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            proxy: self.proxy.clone().filter(|p| !p.trim().is_empty()),
            cookies_path: self.cookies.clone(),
            timeout: Some(self.socket_timeout),
        }
    }

    pub fn downloader(&self) -> DownloaderConfig {
        DownloaderConfig {
            temp_root: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            download_timeout: Duration::from_secs(self.download_timeout),
            cleanup_delay: Duration::from_secs(self.cleanup_delay),
            retry: RetryPolicy::with_max_attempts(self.probe_attempts),
        }
    }

    /// Default tracing filter when RUST_LOG is unset
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "framefetch=debug,framefetch_lib=debug,tower_http=debug"
        } else {
            "framefetch=info,framefetch_lib=info,tower_http=info"
        }
    }
}
