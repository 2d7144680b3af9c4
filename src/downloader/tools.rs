// External tool detection for the health endpoint

use serde::{Deserialize, Serialize};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager {
    ytdlp_override: Option<String>,
}

impl ToolManager {
    pub fn new(ytdlp_override: Option<String>) -> Self {
        Self { ytdlp_override }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.detect_tool(tool_type);
        let version = match &path {
            Some(p) => get_version(p, tool_type).await,
            None => None,
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp).await,
            self.get_tool_info(ToolType::Ffmpeg).await,
        ]
    }

    fn detect_tool(&self, tool_type: ToolType) -> Option<String> {
        if tool_type == ToolType::YtDlp {
            if let Some(path) = &self.ytdlp_override {
                return which::which(path)
                    .ok()
                    .map(|p| p.to_string_lossy().to_string());
            }
        }

        let binary_name = tool_type.as_str();

        // 1. Try common paths first
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];

        for path in common_paths {
            if std::path::Path::new(&path).exists() {
                return Some(path);
            }
        }

        // 2. Try PATH
        which::which(binary_name)
            .ok()
            .map(|p| p.to_string_lossy().to_string())
    }
}

async fn get_version(path: &str, tool_type: ToolType) -> Option<String> {
    let output = Command::new(path)
        .arg(tool_type.version_arg())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    // ffmpeg prints a banner; the first line carries the version
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        assert_eq!(ToolType::YtDlp.as_str(), "yt-dlp");
        assert_eq!(ToolType::Ffmpeg.version_arg(), "-version");
    }

    #[tokio::test]
    async fn test_missing_override_is_unavailable() {
        let manager = ToolManager::new(Some("/nonexistent/yt-dlp-framefetch".to_string()));
        let info = manager.get_tool_info(ToolType::YtDlp).await;
        assert!(!info.is_available);
        assert!(info.version.is_none());
    }
}
