//! Removal of the labels and annotations the template engine injects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chart::Chart;
use crate::error::Result;
use crate::processor::Processor;
use crate::resource::{self, Resource};

const HELM_PREFIX: &str = "helm.sh/";
const HOOK_PREFIX: &str = "helm.sh/hook";
const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
const HELM: &str = "Helm";

/// Labels commonly set from release data, removed when `only_exclusive` is off
const SHARED_KEYS: &[&str] = &[
    "chart",
    "release",
    "heritage",
    "app.kubernetes.io/instance",
    "app.kubernetes.io/version",
];

/// Workload kinds of the `apps` group carrying a pod template
const POD_TEMPLATE_KINDS: &[&str] = &["Deployment", "StatefulSet", "DaemonSet", "ReplicaSet"];

/// Strips engine-injected labels and annotations
///
/// Handles `metadata` and, for `apps` workloads, `spec.template.metadata`.
/// Label or annotation maps left empty are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRemoveHelmData {
    /// Only remove keys that can only come from the engine
    pub only_exclusive: bool,
    /// Also remove `helm.sh/hook*` keys
    pub remove_hooks: bool,
    /// Remove `app.kubernetes.io/managed-by: Helm`
    pub remove_managedby: bool,
}

impl Default for FilterRemoveHelmData {
    fn default() -> Self {
        Self {
            only_exclusive: true,
            remove_hooks: false,
            remove_managedby: true,
        }
    }
}

impl FilterRemoveHelmData {
    pub fn new() -> Self {
        Self::default()
    }

    fn should_remove(&self, key: &str, value: &Value) -> bool {
        if key.starts_with(HELM_PREFIX) {
            return self.remove_hooks || !key.starts_with(HOOK_PREFIX);
        }
        if key == MANAGED_BY {
            return self.remove_managedby && value == HELM;
        }
        if key == "heritage" && value == HELM {
            return true;
        }
        !self.only_exclusive && SHARED_KEYS.contains(&key)
    }

    fn clean_metadata(&self, metadata: &mut Map<String, Value>) {
        for field in ["labels", "annotations"] {
            let Some(Value::Object(map)) = metadata.get_mut(field) else {
                continue;
            };
            map.retain(|key, value| !self.should_remove(key, value));
            if map.is_empty() {
                metadata.remove(field);
            }
        }
    }
}

impl Processor for FilterRemoveHelmData {
    fn mutate(&self, _chart: &Chart, resource: &mut Resource) -> Result<()> {
        if let Some(Value::Object(metadata)) = resource.get_mut("metadata") {
            self.clean_metadata(metadata);
        }

        let (group, _) = resource::api_version_parts(resource::api_version(resource));
        if group == "apps"
            && POD_TEMPLATE_KINDS.contains(&resource::kind(resource))
            && let Some(Value::Object(metadata)) = resource.pointer_mut("/spec/template/metadata")
        {
            self.clean_metadata(metadata);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn process(filter: FilterRemoveHelmData, resource: Resource) -> Resource {
        let chart = Chart::default().with_resources(vec![resource]);
        chart.process(&filter).unwrap().into_resources().remove(0)
    }

    #[test]
    fn test_strip_exclusive() {
        let out = process(
            FilterRemoveHelmData::new(),
            json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {
                    "name": "x",
                    "labels": {
                        "app.kubernetes.io/managed-by": "Helm",
                        "app.kubernetes.io/name": "x"
                    },
                    "annotations": {"helm.sh/chart": "x-1.0.0"}
                }
            }),
        );

        assert_eq!(
            out["metadata"],
            json!({"name": "x", "labels": {"app.kubernetes.io/name": "x"}})
        );
    }

    #[test]
    fn test_hooks_kept_unless_requested() {
        let resource = json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": "migrate",
                "annotations": {
                    "helm.sh/hook": "pre-install",
                    "helm.sh/hook-weight": "1",
                    "helm.sh/resource-policy": "keep"
                }
            }
        });

        let kept = process(FilterRemoveHelmData::new(), resource.clone());
        assert_eq!(
            kept["metadata"]["annotations"],
            json!({"helm.sh/hook": "pre-install", "helm.sh/hook-weight": "1"})
        );

        let removed = process(
            FilterRemoveHelmData {
                remove_hooks: true,
                ..Default::default()
            },
            resource,
        );
        assert!(removed["metadata"].get("annotations").is_none());
    }

    #[test]
    fn test_managed_by_other_tool_kept() {
        let out = process(
            FilterRemoveHelmData::new(),
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "x", "labels": {"app.kubernetes.io/managed-by": "kustomize", "heritage": "Helm"}}
            }),
        );
        assert_eq!(
            out["metadata"]["labels"],
            json!({"app.kubernetes.io/managed-by": "kustomize"})
        );

        let flag_off = process(
            FilterRemoveHelmData {
                remove_managedby: false,
                ..Default::default()
            },
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "x", "labels": {"app.kubernetes.io/managed-by": "Helm"}}
            }),
        );
        assert_eq!(
            flag_off["metadata"]["labels"],
            json!({"app.kubernetes.io/managed-by": "Helm"})
        );
    }

    #[test]
    fn test_non_exclusive_and_pod_template() {
        let out = process(
            FilterRemoveHelmData {
                only_exclusive: false,
                ..Default::default()
            },
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {
                    "name": "web",
                    "labels": {"release": "web", "app": "web", "app.kubernetes.io/instance": "web"}
                },
                "spec": {
                    "template": {
                        "metadata": {
                            "labels": {"chart": "web-1.0.0", "app": "web"},
                            "annotations": {"helm.sh/chart": "web-1.0.0"}
                        }
                    }
                }
            }),
        );

        assert_eq!(out["metadata"]["labels"], json!({"app": "web"}));
        assert_eq!(
            out["spec"]["template"]["metadata"],
            json!({"labels": {"app": "web"}})
        );
    }

    #[test]
    fn test_options_from_yaml() {
        let filter: FilterRemoveHelmData = serde_yaml::from_str("remove_hooks: true\n").unwrap();
        assert!(filter.only_exclusive);
        assert!(filter.remove_hooks);
        assert!(filter.remove_managedby);
    }
}
