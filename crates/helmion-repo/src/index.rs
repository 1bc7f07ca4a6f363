//! Repository index types
//!
//! A [`RepositoryInfo`] is built from a Helm `index.yaml`. Every chart
//! version keeps its index record verbatim in `raw`, and lazily fetches its
//! archive when metadata files are first asked for.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use helmion_core::{ChartConfiguration, TemplateRequest};
use indexmap::IndexMap;
use semver::Version;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OnceCell};

use crate::archive::{self, ArchiveFiles};
use crate::error::{RepoError, Result};
use crate::http::{self, Fetcher};
use crate::version::{VersionConstraint, parse_version};

/// Where a repository lives and how to reach it
#[derive(Debug)]
pub(crate) struct RepositorySource {
    pub(crate) url: String,
    pub(crate) config: Arc<ChartConfiguration>,
    pub(crate) fetcher: Fetcher,
}

/// Top level of `index.yaml`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexFile {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    entries: IndexMap<String, Vec<Value>>,
}

/// The typed part of one version record
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    app_version: Option<Value>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    home: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    created: Option<String>,
}

/// Scalars such as `version: 1.0` come through YAML as numbers
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A chart repository and its charts
#[derive(Debug)]
pub struct RepositoryInfo {
    source: Arc<RepositorySource>,
    api_version: Option<String>,
    charts: IndexMap<String, ChartInfo>,
}

impl RepositoryInfo {
    /// Fetch and parse `<url>/index.yaml`
    pub async fn fetch(url: &str, config: ChartConfiguration) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config)?;
        Self::fetch_with(url, Arc::new(config), fetcher).await
    }

    /// Fetch with an existing configuration and client
    pub async fn fetch_with(
        url: &str,
        config: Arc<ChartConfiguration>,
        fetcher: Fetcher,
    ) -> Result<Self> {
        let index_url = http::join_location(url, "index.yaml");
        let content = fetcher.get_text(&index_url).await?;
        Self::from_index(url, config, fetcher, &content)
    }

    /// Build from the text of an index file
    pub fn from_index(
        url: &str,
        config: Arc<ChartConfiguration>,
        fetcher: Fetcher,
        content: &str,
    ) -> Result<Self> {
        let url = url.trim_end_matches('/').to_string();
        let index: IndexFile =
            serde_yaml::from_str(content).map_err(|e| RepoError::IndexParseError {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let source = Arc::new(RepositorySource {
            url,
            config,
            fetcher,
        });

        let mut charts = IndexMap::new();
        for (name, records) in index.entries {
            let mut versions = records
                .into_iter()
                .map(|raw| ChartVersionInfo::from_record(&source, &name, raw).map(Arc::new))
                .collect::<Result<Vec<_>>>()?;
            versions.sort_by(|a, b| b.semver.cmp(&a.semver));

            charts.insert(
                name.clone(),
                ChartInfo {
                    repository: source.url.clone(),
                    name,
                    versions,
                },
            );
        }

        tracing::debug!(url = %source.url, charts = charts.len(), "loaded repository index");
        Ok(Self {
            source,
            api_version: index.api_version,
            charts,
        })
    }

    pub fn url(&self) -> &str {
        &self.source.url
    }

    pub fn config(&self) -> &ChartConfiguration {
        &self.source.config
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Charts in index order
    pub fn charts(&self) -> impl Iterator<Item = &ChartInfo> {
        self.charts.values()
    }

    pub fn chart(&self, name: &str) -> Option<&ChartInfo> {
        self.charts.get(name)
    }

    /// Latest version, or the newest one matching `version_spec`
    pub fn chart_version(
        &self,
        name: &str,
        version_spec: Option<&str>,
    ) -> Result<Option<Arc<ChartVersionInfo>>> {
        match self.chart(name) {
            Some(chart) => chart.version(version_spec),
            None => Ok(None),
        }
    }

    pub fn must_chart(&self, name: &str) -> Result<&ChartInfo> {
        self.chart(name).ok_or_else(|| RepoError::ChartNotFound {
            name: name.to_string(),
            repo: self.source.url.clone(),
        })
    }

    pub fn must_chart_version(
        &self,
        name: &str,
        version_spec: Option<&str>,
    ) -> Result<Arc<ChartVersionInfo>> {
        self.must_chart(name)?.must_version(version_spec)
    }
}

/// All versions of one chart, newest first
#[derive(Debug)]
pub struct ChartInfo {
    pub repository: String,
    pub name: String,
    pub versions: Vec<Arc<ChartVersionInfo>>,
}

impl ChartInfo {
    pub fn latest(&self) -> Option<&Arc<ChartVersionInfo>> {
        self.versions.first()
    }

    /// First version in descending order that satisfies `version_spec`
    pub fn version(&self, version_spec: Option<&str>) -> Result<Option<Arc<ChartVersionInfo>>> {
        let Some(spec) = version_spec else {
            return Ok(self.latest().cloned());
        };

        let constraint = VersionConstraint::parse(spec)?;
        Ok(self
            .versions
            .iter()
            .find(|v| constraint.matches(&v.semver))
            .cloned())
    }

    pub fn must_version(&self, version_spec: Option<&str>) -> Result<Arc<ChartVersionInfo>> {
        self.version(version_spec)?
            .ok_or_else(|| RepoError::VersionNotFound {
                name: self.name.clone(),
                version: version_spec.unwrap_or("latest").to_string(),
                repo: self.repository.clone(),
            })
    }
}

/// One published version of a chart
pub struct ChartVersionInfo {
    pub name: String,
    pub version: String,
    pub semver: Version,
    pub description: Option<String>,
    pub app_version: Option<String>,
    pub digest: Option<String>,
    pub home: Option<String>,
    pub sources: Vec<String>,
    pub urls: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    /// The index record as published
    pub raw: Value,

    pub(crate) source: Arc<RepositorySource>,
    archive: OnceCell<ArchiveFiles>,
    pub(crate) dependency_charts: Mutex<IndexMap<String, Arc<ChartVersionInfo>>>,
}

impl std::fmt::Debug for ChartVersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartVersionInfo")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("repository", &self.source.url)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

impl ChartVersionInfo {
    fn from_record(source: &Arc<RepositorySource>, chart: &str, raw: Value) -> Result<Self> {
        let record: VersionRecord =
            serde_json::from_value(raw.clone()).map_err(|e| RepoError::IndexParseError {
                url: source.url.clone(),
                message: format!("entry {}: {}", chart, e),
            })?;

        let name = record.name.unwrap_or_else(|| chart.to_string());
        let version = record
            .version
            .as_ref()
            .and_then(scalar_string)
            .unwrap_or_default();
        let semver = parse_version(&version).ok_or_else(|| RepoError::InvalidVersion {
            name: name.clone(),
            version: version.clone(),
            message: "not a semantic version".to_string(),
        })?;

        let created = record.created.as_deref().and_then(|created| {
            match DateTime::parse_from_rfc3339(created) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(chart = %name, version = %version, error = %e, "unparsable created timestamp");
                    None
                }
            }
        });

        Ok(Self {
            app_version: record.app_version.as_ref().and_then(scalar_string),
            description: record.description,
            digest: record.digest,
            home: record.home,
            sources: record.sources,
            urls: record.urls,
            created,
            name,
            version,
            semver,
            raw,
            source: Arc::clone(source),
            archive: OnceCell::new(),
            dependency_charts: Mutex::new(IndexMap::new()),
        })
    }

    /// URL of the repository this version was listed in
    pub fn repository_url(&self) -> &str {
        &self.source.url
    }

    pub fn config(&self) -> &ChartConfiguration {
        &self.source.config
    }

    /// Archive location, resolved against the repository when relative
    pub fn file_url(&self) -> Result<String> {
        let first = self.urls.first().ok_or_else(|| RepoError::NoDownloadUrl {
            name: self.name.clone(),
            version: self.version.clone(),
        })?;
        Ok(http::join_location(&self.source.url, first))
    }

    /// Download the archive into memory, verifying its digest when published
    pub async fn file_open(&self) -> Result<Vec<u8>> {
        let url = self.file_url()?;
        let data = self.source.fetcher.get_bytes(&url).await?;

        if let Some(expected) = self.digest.as_deref().filter(|d| !d.trim().is_empty()) {
            let actual = http::compute_digest(&data);
            if !http::digest_matches(expected, &actual) {
                return Err(RepoError::IntegrityCheckFailed {
                    name: format!("{}@{}", self.name, self.version),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(data)
    }

    /// Metadata files of the archive, downloaded on first use
    pub async fn archive_files(&self) -> Result<&ArchiveFiles> {
        self.archive
            .get_or_try_init(|| async {
                let url = self.file_url()?;
                let data = self.file_open().await?;
                archive::read_archive_files(&data, &url)
            })
            .await
    }

    /// Raw text of one retained archive file
    pub async fn archive_file(&self, name: &str) -> Result<Option<&str>> {
        Ok(self.archive_files().await?.get(name))
    }

    /// Parsed `Chart.yaml`
    pub async fn chart_file(&self) -> Result<Value> {
        let content = self
            .archive_file(archive::CHART_FILE)
            .await?
            .ok_or_else(|| self.missing(archive::CHART_FILE))?;
        Ok(helmion_core::yaml::load_yaml(content)?)
    }

    /// Parsed `values.yaml`; an empty mapping when the chart has none
    pub async fn values_file(&self) -> Result<Value> {
        match self.archive_file(archive::VALUES_FILE).await? {
            Some(content) => match helmion_core::yaml::load_yaml(content)? {
                Value::Null => Ok(Value::Object(Map::new())),
                values => Ok(values),
            },
            None => Ok(Value::Object(Map::new())),
        }
    }

    /// Parsed `values.schema.json`, if the chart ships one
    pub async fn values_schema(&self) -> Result<Option<Value>> {
        match self.archive_file(archive::VALUES_SCHEMA_FILE).await? {
            Some(content) => Ok(Some(serde_json::from_str(content).map_err(|e| {
                RepoError::ArchiveError {
                    url: self.file_url().unwrap_or_default(),
                    message: format!("{}: {}", archive::VALUES_SCHEMA_FILE, e),
                }
            })?)),
            None => Ok(None),
        }
    }

    /// Request rendering exactly this version
    pub fn template_request(&self, release_name: impl Into<String>) -> TemplateRequest {
        TemplateRequest::new(self.name.clone(), release_name)
            .with_repository(self.source.url.clone())
            .with_version(self.version.clone())
    }

    pub(crate) fn missing(&self, file: &str) -> RepoError {
        RepoError::MissingArchiveFile {
            name: self.name.clone(),
            version: self.version.clone(),
            file: file.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::time::Duration;

    pub fn repository(url: &str, index: &str) -> RepositoryInfo {
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        RepositoryInfo::from_index(url, Arc::new(ChartConfiguration::default()), fetcher, index)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::repository;
    use super::*;
    use crate::archive::testing::build_archive;
    use helmion_core::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX: &str = r#"
apiVersion: v1
generated: "2024-01-01T00:00:00Z"
entries:
  nginx:
    - name: nginx
      version: "14.0.0"
      appVersion: "1.24.0"
      description: NGINX Open Source
      urls:
        - nginx-14.0.0.tgz
      created: "2023-06-01T10:00:00Z"
    - name: nginx
      version: v15.1.0
      appVersion: 1.25
      urls:
        - https://cdn.example.com/nginx-15.1.0.tgz
      digest: "sha256:abc123"
      created: "not a date"
    - name: nginx
      version: "15.0.0"
      urls:
        - nginx-15.0.0.tgz
  redis:
    - name: redis
      version: "17.0.0"
      urls:
        - redis-17.0.0.tgz
"#;

    #[test]
    fn test_versions_sorted_descending() {
        let repo = repository("https://charts.example.com/", INDEX);
        let nginx = repo.must_chart("nginx").unwrap();

        let versions: Vec<_> = nginx.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, vec!["v15.1.0", "15.0.0", "14.0.0"]);
        for v in &nginx.versions {
            assert!(nginx.versions[0].semver >= v.semver);
        }
        assert_eq!(repo.url(), "https://charts.example.com");
    }

    #[test]
    fn test_record_fields() {
        let repo = repository("https://charts.example.com", INDEX);
        let latest = repo.chart_version("nginx", None).unwrap().unwrap();

        assert_eq!(latest.semver, Version::new(15, 1, 0));
        assert_eq!(latest.app_version.as_deref(), Some("1.25"));
        assert!(latest.created.is_none());
        assert_eq!(latest.raw["digest"], "sha256:abc123");

        let old = repo.chart_version("nginx", Some("14.0.0")).unwrap().unwrap();
        assert_eq!(old.description.as_deref(), Some("NGINX Open Source"));
        assert!(old.created.is_some());
    }

    #[test]
    fn test_version_lookup() {
        let repo = repository("https://charts.example.com", INDEX);

        let v = repo.chart_version("nginx", Some("~15.0.0")).unwrap().unwrap();
        assert_eq!(v.version, "15.0.0");
        let v = repo.chart_version("nginx", Some(">=14.0.0")).unwrap().unwrap();
        assert_eq!(v.version, "v15.1.0");
        assert!(repo.chart_version("nginx", Some("^16")).unwrap().is_none());
        assert!(repo.chart_version("mysql", None).unwrap().is_none());
    }

    #[test]
    fn test_must_lookups() {
        let repo = repository("https://charts.example.com", INDEX);

        let err = repo.must_chart("mysql").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);

        let err = repo.must_chart_version("nginx", Some("^16")).unwrap_err();
        assert!(matches!(err, RepoError::VersionNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_file_url() {
        let repo = repository("https://charts.example.com/stable", INDEX);

        let relative = repo.must_chart_version("nginx", Some("15.0.0")).unwrap();
        assert_eq!(
            relative.file_url().unwrap(),
            "https://charts.example.com/stable/nginx-15.0.0.tgz"
        );
        let absolute = repo.must_chart_version("nginx", None).unwrap();
        assert_eq!(
            absolute.file_url().unwrap(),
            "https://cdn.example.com/nginx-15.1.0.tgz"
        );
    }

    #[test]
    fn test_template_request() {
        let repo = repository("https://charts.example.com", INDEX);
        let request = repo
            .must_chart_version("redis", None)
            .unwrap()
            .template_request("cache");

        assert_eq!(request.repository.as_deref(), Some("https://charts.example.com"));
        assert_eq!(request.chart, "redis");
        assert_eq!(request.version.as_deref(), Some("17.0.0"));
        assert_eq!(request.release_name, "cache");
    }

    #[test]
    fn test_invalid_version_is_configuration_error() {
        let fetcher = Fetcher::new(std::time::Duration::from_secs(5)).unwrap();
        let err = RepositoryInfo::from_index(
            "https://charts.example.com",
            Arc::new(ChartConfiguration::default()),
            fetcher,
            "entries:\n  bad:\n    - name: bad\n      version: latest\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_unparsable_index() {
        let fetcher = Fetcher::new(std::time::Duration::from_secs(5)).unwrap();
        let err = RepositoryInfo::from_index(
            "https://charts.example.com",
            Arc::new(ChartConfiguration::default()),
            fetcher,
            "entries: [unclosed",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputOutput);
    }

    #[tokio::test]
    async fn test_fetch_and_read_archive() {
        let archive = build_archive(&[
            ("web/Chart.yaml", "apiVersion: v2\nname: web\nversion: 1.0.0\n"),
            ("web/values.yaml", "replicaCount: 2\n"),
            ("web/values.schema.json", r#"{"type": "object"}"#),
        ]);
        let digest = http::compute_digest(&archive);
        let index = format!(
            "entries:\n  web:\n    - name: web\n      version: 1.0.0\n      digest: \"{}\"\n      urls: [charts/web-1.0.0.tgz]\n",
            digest
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/charts/web-1.0.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .expect(1)
            .mount(&server)
            .await;

        let repo = RepositoryInfo::fetch(&server.uri(), ChartConfiguration::default())
            .await
            .unwrap();
        let web = repo.must_chart_version("web", None).unwrap();

        assert_eq!(web.chart_file().await.unwrap()["name"], "web");
        assert_eq!(web.values_file().await.unwrap()["replicaCount"], 2);
        assert_eq!(
            web.values_schema().await.unwrap(),
            Some(serde_json::json!({"type": "object"}))
        );
        assert!(web.archive_file("Chart.lock").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_digest_mismatch() {
        let archive = build_archive(&[("web/Chart.yaml", "apiVersion: v2\nname: web\n")]);
        let index = "entries:\n  web:\n    - name: web\n      version: 1.0.0\n      digest: sha256:0000\n      urls: [web-1.0.0.tgz]\n";

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/web-1.0.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let repo = RepositoryInfo::fetch(&server.uri(), ChartConfiguration::default())
            .await
            .unwrap();
        let err = repo
            .must_chart_version("web", None)
            .unwrap()
            .chart_file()
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::IntegrityCheckFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_chart_file() {
        let archive = build_archive(&[("web/values.yaml", "a: 1\n")]);
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "entries:\n  web:\n    - name: web\n      version: 1.0.0\n      urls: [web-1.0.0.tgz]\n",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/web-1.0.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let repo = RepositoryInfo::fetch(&server.uri(), ChartConfiguration::default())
            .await
            .unwrap();
        let err = repo
            .must_chart_version("web", None)
            .unwrap()
            .chart_file()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputOutput);
    }

    #[tokio::test]
    async fn test_index_not_found() {
        let server = MockServer::start().await;
        let err = RepositoryInfo::fetch(&server.uri(), ChartConfiguration::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
