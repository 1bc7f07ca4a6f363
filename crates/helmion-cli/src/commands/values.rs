//! Values command - print the effective default values of a chart

use helmion_core::yaml::dump_yaml;

use crate::error::Result;

pub async fn run(
    repo: &str,
    chart: &str,
    version: Option<&str>,
    no_dependencies: bool,
) -> Result<()> {
    let chart_version = super::chart_version(repo, chart, version).await?;

    let values = if no_dependencies {
        chart_version.values_file().await?
    } else {
        chart_version.values_with_dependencies().await?
    };

    tracing::debug!(chart = %chart_version.name, version = %chart_version.version, "resolved values");
    print!("{}", dump_yaml(&values)?);
    Ok(())
}
