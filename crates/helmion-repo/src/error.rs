//! Error types for repository operations

use helmion_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Repository operation errors
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    // ============ Network Errors ============
    #[error("HTTP error fetching {url}: {status}")]
    HttpError { url: String, status: u16 },

    #[error("Network error fetching {url}: {message}")]
    NetworkError { url: String, message: String },

    // ============ Index Errors ============
    #[error("Index parse error for {url}: {message}")]
    IndexParseError { url: String, message: String },

    #[error("Invalid version '{version}' for chart {name}: {message}")]
    InvalidVersion {
        name: String,
        version: String,
        message: String,
    },

    #[error("Invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("Chart not found: {name} in repository {repo}")]
    ChartNotFound { name: String, repo: String },

    #[error("Version not found: {name}@{version} in repository {repo}")]
    VersionNotFound {
        name: String,
        version: String,
        repo: String,
    },

    #[error("No download URL for {name}@{version}")]
    NoDownloadUrl { name: String, version: String },

    // ============ Archive Errors ============
    #[error("Invalid chart archive {url}: {message}")]
    ArchiveError { url: String, message: String },

    #[error("Archive member has an absolute path: {path}")]
    UnsafeArchivePath { path: String },

    #[error("{file} not found in archive of {name}@{version}")]
    MissingArchiveFile {
        name: String,
        version: String,
        file: String,
    },

    #[error("Integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        name: String,
        expected: String,
        actual: String,
    },

    // ============ Dependency Errors ============
    #[error("Unsupported Chart.yaml apiVersion '{api_version}' in {name}")]
    UnsupportedApiVersion { name: String, api_version: String },

    #[error("Unsupported repository '{repository}' for dependency {name}")]
    UnsupportedRepository { name: String, repository: String },

    #[error("Dependency {name} is not declared by {chart}")]
    UnknownDependency { name: String, chart: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    // ============ IO Errors ============
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::HttpError { .. } | Self::NetworkError { .. } => ErrorKind::Network,
            Self::IndexParseError { .. }
            | Self::ArchiveError { .. }
            | Self::UnsafeArchivePath { .. }
            | Self::MissingArchiveFile { .. }
            | Self::IntegrityCheckFailed { .. }
            | Self::Io { .. } => ErrorKind::InputOutput,
            Self::InvalidVersion { .. }
            | Self::NoDownloadUrl { .. }
            | Self::UnsupportedApiVersion { .. }
            | Self::CircularDependency { .. } => ErrorKind::Configuration,
            Self::InvalidConstraint { .. }
            | Self::ChartNotFound { .. }
            | Self::VersionNotFound { .. }
            | Self::UnsupportedRepository { .. }
            | Self::UnknownDependency { .. } => ErrorKind::Parameter,
        }
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        if let Some(status) = e.status() {
            RepoError::HttpError {
                url,
                status: status.as_u16(),
            }
        } else if e.is_timeout() {
            RepoError::NetworkError {
                url,
                message: format!("Request timed out: {}", e),
            }
        } else if e.is_connect() {
            RepoError::NetworkError {
                url,
                message: format!("Connection failed: {}", e),
            }
        } else {
            RepoError::NetworkError {
                url,
                message: e.to_string(),
            }
        }
    }
}
