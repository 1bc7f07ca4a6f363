//! Fetching repository indexes and chart archives
//!
//! Locations are either `http(s)://` URLs or local paths (optionally as
//! `file://` URLs) so a repository can be served from disk.

use std::path::PathBuf;
use std::time::Duration;

use helmion_core::ChartConfiguration;
use sha2::{Digest, Sha256};

use crate::error::{RepoError, Result};

/// Client for remote and local repository content
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher whose HTTP requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("helmion/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepoError::NetworkError {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ChartConfiguration) -> Result<Self> {
        Self::new(config.http_timeout)
    }

    /// Fetch raw bytes
    pub async fn get_bytes(&self, location: &str) -> Result<Vec<u8>> {
        if !is_remote(location) {
            let path = local_path(location);
            tracing::debug!(path = %path.display(), "reading local file");
            return tokio::fs::read(&path).await.map_err(|source| RepoError::Io {
                path: path.display().to_string(),
                source,
            });
        }

        tracing::debug!(url = location, "fetching");
        let response = self.client.get(location).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::HttpError {
                url: location.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            url: location.to_string(),
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    /// Fetch UTF-8 text
    pub async fn get_text(&self, location: &str) -> Result<String> {
        let bytes = self.get_bytes(location).await?;
        String::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            url: location.to_string(),
            message: format!("Invalid UTF-8: {}", e),
        })
    }
}

/// True for `http://` and `https://` locations
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn local_path(location: &str) -> PathBuf {
    match url::Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .unwrap_or_else(|_| PathBuf::from(location.trim_start_matches("file://"))),
        _ => PathBuf::from(location),
    }
}

/// Join `relative` onto a repository location unless it is already absolute
pub fn join_location(base: &str, relative: &str) -> String {
    if is_remote(relative) || relative.starts_with("file://") {
        return relative.to_string();
    }
    if is_remote(base)
        && let Ok(base_url) = url::Url::parse(&format!("{}/", base.trim_end_matches('/')))
        && let Ok(joined) = base_url.join(relative)
    {
        return joined.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative)
}

/// Compute SHA256 digest of data
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("sha256:{}", hex::encode(result))
}

/// Check if two digests match (supports various formats)
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    let normalize = |digest: &str| {
        digest
            .trim()
            .to_lowercase()
            .replace("sha256:", "")
            .replace("sha256-", "")
    };
    normalize(expected) == normalize(actual)
}
