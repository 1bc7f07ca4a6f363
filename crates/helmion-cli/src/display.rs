//! Display formatting for CLI output

use console::style;
use helmion_repo::{ChartInfo, ChartVersionInfo, Dependency};
use std::fmt::Write;

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Version table for `helmion versions`, newest first
pub fn versions_table(chart: &ChartInfo, limit: Option<usize>) -> String {
    let mut out = format!(
        "{:<20} {:<20} {:<12} DESCRIPTION\n",
        "VERSION", "APP VERSION", "CREATED"
    );
    let shown = limit.unwrap_or(chart.versions.len());

    for version in chart.versions.iter().take(shown) {
        let created = version
            .created
            .map(|c| c.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let description = version
            .description
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(50)
            .collect::<String>();

        let _ = writeln!(
            out,
            "{:<20} {:<20} {:<12} {}",
            version.version,
            version.app_version.as_deref().unwrap_or("-"),
            created,
            description
        );
    }

    if shown < chart.versions.len() {
        let _ = writeln!(
            out,
            "... {} not shown",
            pluralize(chart.versions.len() - shown, "version", "versions")
        );
    }
    out
}

/// One line per dependency: declared constraint and what it resolved to
pub fn dependency_line(dependency: &Dependency, resolved: &ChartVersionInfo) -> String {
    format!(
        "{} {} {} {}",
        style(&dependency.name).cyan().bold(),
        dependency.version.as_deref().unwrap_or("*"),
        style("→").dim(),
        style(format!("{} ({})", resolved.version, resolved.repository_url())).green()
    )
}

/// Comment line opening a category in a multi-category YAML stream
pub fn category_header(name: &str) -> String {
    format!("# helmion category: {}", name)
}

pub fn print_wrote(path: &std::path::Path) {
    println!("{} {}", style("wrote").green(), path.display());
}
