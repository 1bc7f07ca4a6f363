//! Versions command - list the published versions of a chart

use helmion_core::ChartConfiguration;
use helmion_repo::RepositoryInfo;

use crate::display;
use crate::error::Result;

pub async fn run(repo: &str, chart: &str, limit: Option<usize>) -> Result<()> {
    let repository = RepositoryInfo::fetch(repo, ChartConfiguration::default()).await?;
    let chart = repository.must_chart(chart)?;

    print!("{}", display::versions_table(chart, limit));
    Ok(())
}
