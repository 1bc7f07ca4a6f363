//! Kubernetes resource classification
//!
//! A resource is kept as the raw JSON object it was parsed from so that
//! every key, including ones helmion knows nothing about, survives
//! processing in its original order.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// A single Kubernetes manifest object
pub type Resource = Value;

/// Kinds whose identity is not scoped to a namespace
pub const NON_NAMESPACED_KINDS: &[&str] = &[
    "List",
    "Namespace",
    "Node",
    "PersistentVolume",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
    "CustomResourceDefinition",
    "APIService",
    "TokenReview",
    "SelfSubjectAccessReview",
    "SelfSubjectRulesReview",
    "SubjectAccessReview",
    "CertificateSigningRequest",
    "NodeMetrics",
    "StorageState",
    "StorageVersionMigration",
    "RuntimeClass",
    "PodSecurityPolicy",
    "ClusterRole",
    "ClusterRoleBinding",
    "PriorityClass",
    "CSIDriver",
    "CSINode",
    "StorageClass",
    "VolumeAttachment",
    "ComponentStatus",
];

/// Decide whether a resource of this type lives inside a namespace
pub fn is_namespaced(_api_version: &str, kind: &str) -> bool {
    !NON_NAMESPACED_KINDS.contains(&kind)
}

/// Split an apiVersion into `(group, version)`; the core group is `""`
pub fn api_version_parts(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

pub fn api_version(obj: &Resource) -> &str {
    obj.get("apiVersion").and_then(Value::as_str).unwrap_or("")
}

pub fn kind(obj: &Resource) -> &str {
    obj.get("kind").and_then(Value::as_str).unwrap_or("")
}

pub fn metadata(obj: &Resource) -> Option<&Map<String, Value>> {
    obj.get("metadata").and_then(Value::as_object)
}

pub fn name(obj: &Resource) -> Option<&str> {
    metadata(obj)?.get("name")?.as_str()
}

pub fn namespace(obj: &Resource) -> Option<&str> {
    metadata(obj)?.get("namespace")?.as_str()
}

pub fn annotations(obj: &Resource) -> Option<&Map<String, Value>> {
    metadata(obj)?.get("annotations")?.as_object()
}

pub fn labels(obj: &Resource) -> Option<&Map<String, Value>> {
    metadata(obj)?.get("labels")?.as_object()
}

/// Short `Kind/name` form used in messages
pub fn describe(obj: &Resource) -> String {
    format!("{}/{}", kind(obj), name(obj).unwrap_or("<unnamed>"))
}

/// Whether this particular object is of a namespaced type
pub fn is_namespaced_resource(obj: &Resource) -> bool {
    is_namespaced(api_version(obj), kind(obj))
}

/// Match criteria for [`is_any_resource`] and [`is_all_resources`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSpec {
    pub api_version_group: Option<String>,
    pub api_version_name: Option<String>,
    pub kind: Option<String>,
}

impl ResourceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.api_version_group = Some(group.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.api_version_name = Some(version.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Check an object against this spec
    pub fn matches(&self, obj: &Resource) -> Result<bool> {
        is_resource(
            obj,
            self.api_version_group.as_deref(),
            self.api_version_name.as_deref(),
            self.kind.as_deref(),
        )
    }
}

/// Check an object's apiVersion group, apiVersion version and kind
///
/// At least one criterion is required.
pub fn is_resource(
    obj: &Resource,
    api_version_group: Option<&str>,
    api_version_name: Option<&str>,
    kind_name: Option<&str>,
) -> Result<bool> {
    if api_version_group.is_none() && api_version_name.is_none() && kind_name.is_none() {
        return Err(CoreError::parameter(
            "at least one of apiVersion group, apiVersion name or kind is required",
        ));
    }

    let (group, version) = api_version_parts(api_version(obj));
    if api_version_group.is_some_and(|g| g != group) {
        return Ok(false);
    }
    if api_version_name.is_some_and(|v| v != version) {
        return Ok(false);
    }
    if kind_name.is_some_and(|k| k != kind(obj)) {
        return Ok(false);
    }
    Ok(true)
}

/// True if any of the specs matches
pub fn is_any_resource(obj: &Resource, specs: &[ResourceSpec]) -> Result<bool> {
    for spec in specs {
        if spec.matches(obj)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// True if every spec matches
pub fn is_all_resources(obj: &Resource, specs: &[ResourceSpec]) -> Result<bool> {
    for spec in specs {
        if !spec.matches(obj)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A core-group `List` wrapping further resources in `items`
pub fn is_list_resource(obj: &Resource) -> bool {
    let (group, _) = api_version_parts(api_version(obj));
    group.is_empty() && kind(obj) == "List"
}

/// A `CustomResourceDefinition` from `apiextensions.k8s.io`
pub fn is_crd(obj: &Resource) -> bool {
    let (group, _) = api_version_parts(api_version(obj));
    group == "apiextensions.k8s.io" && kind(obj) == "CustomResourceDefinition"
}
