//! Dependencies command - resolve declared dependencies

use console::style;

use crate::display;
use crate::error::Result;

/// List dependencies with the chart version each one resolves to
pub async fn list(repo: &str, chart: &str, version: Option<&str>) -> Result<()> {
    let chart_version = super::chart_version(repo, chart, version).await?;
    let dependencies = chart_version.dependencies().await?;

    println!(
        "{} {}",
        style(format!("{}@{}", chart_version.name, chart_version.version)).bold(),
        style(display::pluralize(dependencies.len(), "dependency", "dependencies")).dim()
    );

    for (name, dependency) in &dependencies {
        let resolved = chart_version.dependency_chart(name).await?;
        println!("  {}", display::dependency_line(dependency, &resolved));
    }
    Ok(())
}
