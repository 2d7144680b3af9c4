// Platform detection - URL validation and the supported-platform table

use url::Url;

use crate::downloader::DownloadError;

/// Domain fragment → platform name, in lookup order
const SUPPORTED_PLATFORMS: [(&str, &str); 6] = [
    ("youtube.com", "YouTube"),
    ("youtu.be", "YouTube"),
    ("tiktok.com", "TikTok"),
    ("facebook.com", "Facebook"),
    ("fb.watch", "Facebook"),
    ("instagram.com", "Instagram"),
];

/// Distinct platform names, table order
pub fn supported_platforms() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for (_, name) in SUPPORTED_PLATFORMS {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Validate the URL and name its platform
pub fn detect_platform(raw: &str) -> Result<&'static str, DownloadError> {
    let url = validate_url(raw)?;
    let host = url
        .host_str()
        .ok_or_else(|| DownloadError::InvalidUrl(raw.to_string()))?
        .to_ascii_lowercase();

    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);

    SUPPORTED_PLATFORMS
        .iter()
        .find(|(domain, _)| host.contains(domain))
        .map(|(_, name)| *name)
        .ok_or_else(|| DownloadError::UnsupportedPlatform(host.to_string()))
}

/// Absolute http(s) URL with a host
pub fn validate_url(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw.trim()).map_err(|_| DownloadError::InvalidUrl(raw.to_string()))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(DownloadError::InvalidUrl(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        assert_eq!(detect_platform("https://www.youtube.com/watch?v=abc").unwrap(), "YouTube");
        assert_eq!(detect_platform("https://m.youtube.com/watch?v=abc").unwrap(), "YouTube");
        assert_eq!(detect_platform("https://youtu.be/abc").unwrap(), "YouTube");
        assert_eq!(detect_platform("https://vm.tiktok.com/xyz").unwrap(), "TikTok");
        assert_eq!(detect_platform("https://fb.watch/xyz").unwrap(), "Facebook");
        assert_eq!(detect_platform("HTTPS://WWW.INSTAGRAM.COM/reel/x").unwrap(), "Instagram");
    }

    #[test]
    fn test_unsupported_platform() {
        assert!(matches!(
            detect_platform("https://vimeo.com/123"),
            Err(DownloadError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_invalid_urls() {
        for raw in ["not a url", "ftp://youtube.com/x", "youtube.com/watch", "file:///etc/passwd"] {
            assert!(
                matches!(detect_platform(raw), Err(DownloadError::InvalidUrl(_))),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_platform_list() {
        assert_eq!(
            supported_platforms(),
            vec!["YouTube", "TikTok", "Facebook", "Instagram"]
        );
    }
}
