//! CLI commands

pub mod dep;
pub mod template;
pub mod values;
pub mod versions;

use helmion_core::ChartConfiguration;
use helmion_repo::{ChartVersionInfo, RepositoryInfo};
use std::sync::Arc;

use crate::error::Result;

/// Fetch a repository index and pick one chart version
pub async fn chart_version(
    repo: &str,
    chart: &str,
    version: Option<&str>,
) -> Result<Arc<ChartVersionInfo>> {
    let repository = RepositoryInfo::fetch(repo, ChartConfiguration::default()).await?;
    Ok(repository.must_chart_version(chart, version)?)
}
