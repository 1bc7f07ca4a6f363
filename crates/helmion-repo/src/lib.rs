//! Helmion Repository Access
//!
//! This crate reads Helm chart repositories:
//!
//! - **Index reader**: `index.yaml` over HTTP(S) or from disk, versions sorted newest first
//! - **Version matching**: loose version coercion and Helm-style constraints
//! - **Archive reader**: chart metadata files read from the `.tgz` in memory, digest verified
//! - **Dependency resolver**: v1/v2 dependency declarations, merged values across the tree
//!
//! ## Example
//!
//! ```rust,no_run
//! use helmion_core::ChartConfiguration;
//! use helmion_repo::RepositoryInfo;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = RepositoryInfo::fetch("https://charts.example.com", ChartConfiguration::default()).await?;
//! let nginx = repo.must_chart_version("nginx", Some("^15"))?;
//!
//! let values = nginx.values_with_dependencies().await?;
//! let request = nginx.template_request("web");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod dependency;
pub mod error;
pub mod http;
pub mod index;
pub mod version;

// Re-exports for convenience
pub use archive::{ArchiveFiles, read_archive_files};
pub use dependency::{Dependency, resolve_repository_url};
pub use error::{RepoError, Result};
pub use http::Fetcher;
pub use index::{ChartInfo, ChartVersionInfo, RepositoryInfo};
pub use version::{VersionConstraint, parse_version};
