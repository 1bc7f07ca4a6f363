//! Chart dependency resolution
//!
//! Dependencies are declared in `Chart.yaml` (apiVersion v2) or in
//! `requirements.yaml` (apiVersion v1). Each one is resolved against its own
//! repository index; legacy `file://` repositories point back at the
//! repository of the parent chart.

use std::sync::Arc;

use futures::future::BoxFuture;
use helmion_core::values::deep_merge;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::archive;
use crate::error::{RepoError, Result};
use crate::http;
use crate::index::{ChartVersionInfo, RepositoryInfo};

/// A dependency as declared by a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Default, Deserialize)]
struct DependencySection {
    #[serde(default)]
    dependencies: Option<Vec<Dependency>>,
}

/// Map a dependency's repository onto the URL its index is fetched from
///
/// `http(s)` URLs are used as is; `file://./` and `file://../` refer to the
/// parent chart's repository. Anything else is rejected.
pub fn resolve_repository_url(parent_repository: &str, dependency: &Dependency) -> Result<String> {
    let repository = dependency.repository.trim();
    if http::is_remote(repository) {
        return Ok(repository.trim_end_matches('/').to_string());
    }
    if repository.starts_with("file://./") || repository.starts_with("file://../") {
        return Ok(parent_repository.to_string());
    }
    Err(RepoError::UnsupportedRepository {
        name: dependency.name.clone(),
        repository: dependency.repository.clone(),
    })
}

fn parse_section(content: &str) -> Result<Vec<Dependency>> {
    let section: Option<DependencySection> =
        serde_yaml::from_str(content).map_err(helmion_core::CoreError::from)?;
    Ok(section.and_then(|s| s.dependencies).unwrap_or_default())
}

impl ChartVersionInfo {
    /// Declared dependencies, in declaration order
    pub async fn dependency_list(&self) -> Result<Vec<Dependency>> {
        let chart_file = self
            .archive_file(archive::CHART_FILE)
            .await?
            .ok_or_else(|| self.missing(archive::CHART_FILE))?;
        let chart: Value = helmion_core::yaml::load_yaml(chart_file)?;
        let api_version = chart.get("apiVersion").and_then(Value::as_str).unwrap_or("");

        match api_version {
            "v2" => parse_section(chart_file),
            "v1" => match self.archive_file(archive::REQUIREMENTS_FILE).await? {
                Some(requirements) => parse_section(requirements),
                None => Ok(Vec::new()),
            },
            other => Err(RepoError::UnsupportedApiVersion {
                name: format!("{}@{}", self.name, self.version),
                api_version: other.to_string(),
            }),
        }
    }

    /// Declared dependencies by name
    pub async fn dependencies(&self) -> Result<IndexMap<String, Dependency>> {
        Ok(self
            .dependency_list()
            .await?
            .into_iter()
            .map(|dep| (dep.name.clone(), dep))
            .collect())
    }

    /// Resolve one declared dependency to a chart version
    ///
    /// Resolutions are remembered for the lifetime of this chart version.
    pub async fn dependency_chart(&self, name: &str) -> Result<Arc<ChartVersionInfo>> {
        let mut resolved = self.dependency_charts.lock().await;
        if let Some(chart) = resolved.get(name) {
            return Ok(Arc::clone(chart));
        }

        let dependencies = self.dependencies().await?;
        let dependency = dependencies
            .get(name)
            .ok_or_else(|| RepoError::UnknownDependency {
                name: name.to_string(),
                chart: format!("{}@{}", self.name, self.version),
            })?;

        let url = resolve_repository_url(self.repository_url(), dependency)?;
        tracing::debug!(
            chart = %self.name,
            dependency = %dependency.name,
            version = dependency.version.as_deref().unwrap_or("latest"),
            repository = %url,
            "resolving dependency"
        );

        let repository = RepositoryInfo::fetch_with(
            &url,
            Arc::clone(&self.source.config),
            self.source.fetcher.clone(),
        )
        .await?;
        let chart = repository.must_chart_version(&dependency.name, dependency.version.as_deref())?;

        resolved.insert(name.to_string(), Arc::clone(&chart));
        Ok(chart)
    }

    /// Every declared dependency, resolved
    pub async fn dependency_charts(&self) -> Result<IndexMap<String, Arc<ChartVersionInfo>>> {
        let mut charts = IndexMap::new();
        for name in self.dependencies().await?.into_keys() {
            let chart = self.dependency_chart(&name).await?;
            charts.insert(name, chart);
        }
        Ok(charts)
    }

    /// `values.yaml` with every dependency's values nested under its name
    ///
    /// Dependency values are resolved recursively; the parent's own values
    /// win on conflict.
    pub async fn values_with_dependencies(&self) -> Result<Value> {
        let mut visiting = Vec::new();
        self.merged_values(&mut visiting).await
    }

    fn identity(&self) -> (String, String, String) {
        (
            self.repository_url().to_string(),
            self.name.clone(),
            self.version.clone(),
        )
    }

    fn merged_values<'a>(
        &'a self,
        visiting: &'a mut Vec<(String, String, String)>,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let identity = self.identity();
            if visiting.contains(&identity) {
                let cycle = visiting
                    .iter()
                    .chain(std::iter::once(&identity))
                    .map(|(_, name, version)| format!("{}@{}", name, version))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(RepoError::CircularDependency { cycle });
            }
            visiting.push(identity);

            let own = self.values_file().await?;
            let mut merged = match &own {
                Value::Object(map) => map.clone(),
                _ => Map::new(),
            };

            for (name, chart) in self.dependency_charts().await? {
                let mut values = chart.merged_values(visiting).await?;
                if let Some(parent) = own.get(&name) {
                    deep_merge(&mut values, parent);
                }
                merged.insert(name, values);
            }

            visiting.pop();
            Ok(Value::Object(merged))
        })
    }
}
