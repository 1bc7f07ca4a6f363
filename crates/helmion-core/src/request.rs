//! Template request: what to render and how to invoke the engine

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

fn default_command() -> String {
    "helm".to_string()
}

/// Options passed through to the external template engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    /// Engine executable (default: `helm`)
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub include_crds: bool,

    /// Kubernetes version used for `Capabilities.KubeVersion`
    #[serde(default)]
    pub kube_version: Option<String>,

    /// Extra API versions reported to the templates
    #[serde(default)]
    pub api_versions: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            command: default_command(),
            debug: false,
            include_crds: false,
            kube_version: None,
            api_versions: Vec::new(),
        }
    }
}

/// A request to render one chart
///
/// ```yaml
/// repository: https://charts.example.com
/// chart: nginx
/// version: 15.0.0
/// releaseName: web
/// namespace: frontend
/// sets:
///   replicaCount: 2
/// values:
///   service:
///     type: ClusterIP
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    /// Repository URL; `None` lets the engine resolve `chart` itself
    #[serde(default)]
    pub repository: Option<String>,

    pub chart: String,

    #[serde(default)]
    pub version: Option<String>,

    pub release_name: String,

    #[serde(default)]
    pub namespace: Option<String>,

    /// Dotted path to scalar overrides
    #[serde(default)]
    pub sets: IndexMap<String, Value>,

    /// Values mapping written to an override file
    #[serde(default)]
    pub values: Map<String, Value>,

    #[serde(default)]
    pub options: EngineOptions,
}

impl TemplateRequest {
    pub fn new(chart: impl Into<String>, release_name: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            release_name: release_name.into(),
            ..Default::default()
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a `--set` override; the value must be a scalar
    pub fn with_set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let path = path.into();
        let value = value.into();
        if value.is_array() || value.is_object() {
            return Err(CoreError::parameter(format!(
                "set '{}' must be a scalar, got {}",
                path, value
            )));
        }
        self.sets.insert(path, value);
        Ok(self)
    }

    pub fn with_values(mut self, values: Map<String, Value>) -> Self {
        self.values = values;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let request = TemplateRequest::new("nginx", "web")
            .with_repository("https://charts.example.com")
            .with_version("15.0.0")
            .with_namespace("frontend")
            .with_set("replicaCount", 2)
            .unwrap();

        assert_eq!(request.chart, "nginx");
        assert_eq!(request.release_name, "web");
        assert_eq!(request.sets["replicaCount"], json!(2));
        assert_eq!(request.options.command, "helm");
    }

    #[test]
    fn test_set_rejects_collections() {
        let err = TemplateRequest::new("nginx", "web")
            .with_set("list", json!([1, 2]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_from_yaml() {
        let request: TemplateRequest = serde_yaml::from_str(
            r#"
chart: nginx
releaseName: web
sets:
  image.tag: "1.25"
values:
  service:
    type: ClusterIP
options:
  includeCrds: true
  apiVersions: [monitoring.coreos.com/v1]
"#,
        )
        .unwrap();

        assert_eq!(request.options.command, "helm");
        assert!(request.options.include_crds);
        assert_eq!(request.options.api_versions.len(), 1);
        assert_eq!(request.values["service"]["type"], "ClusterIP");
    }
}
