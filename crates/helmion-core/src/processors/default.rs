//! General purpose processor: namespace injection, filtering and patching

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::chart::Chart;
use crate::error::{CoreError, Result};
use crate::jsonpatch::JsonPatchRule;
use crate::processor::Processor;
use crate::resource::{self, Resource};
use crate::splitter::ChartPredicate;

/// Annotation marking a resource as a lifecycle hook
pub const HOOK_ANNOTATION: &str = "helm.sh/hook";

/// Three-way filter on a boolean property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolFilter {
    /// Keep everything
    #[default]
    #[serde(alias = "ALL")]
    All,
    /// Keep resources where the property holds
    #[serde(alias = "IF_TRUE")]
    IfTrue,
    /// Keep resources where the property does not hold
    #[serde(alias = "IF_FALSE")]
    IfFalse,
}

impl BoolFilter {
    pub fn accepts(self, value: bool) -> bool {
        match self {
            Self::All => true,
            Self::IfTrue => value,
            Self::IfFalse => !value,
        }
    }
}

/// Namespace to add to namespaced resources that have none
///
/// In YAML this is either a boolean or a namespace name:
///
/// ```yaml
/// add_namespace: true      # inherit from the template request
/// add_namespace: backend   # fixed namespace
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddNamespace {
    /// `true` inherits the namespace of the chart's template request
    Inherit(bool),
    Name(String),
}

impl Default for AddNamespace {
    fn default() -> Self {
        Self::Inherit(false)
    }
}

impl AddNamespace {
    fn resolve(&self, chart: &Chart) -> Result<Option<String>> {
        match self {
            Self::Inherit(false) => Ok(None),
            Self::Name(name) => Ok(Some(name.clone())),
            Self::Inherit(true) => {
                let request = chart.request().ok_or_else(|| {
                    CoreError::parameter(
                        "add_namespace: true requires a chart bound to a template request",
                    )
                })?;
                let namespace = request.namespace.clone().ok_or_else(|| {
                    CoreError::parameter(format!(
                        "add_namespace: true but the request for '{}' has no namespace",
                        request.chart
                    ))
                })?;
                Ok(Some(namespace))
            }
        }
    }
}

/// Options for [`DefaultProcessor`]
///
/// ```yaml
/// add_namespace: app
/// namespaced_filter: all
/// hook_filter: if_false
/// jsonpatches:
///   - condition:
///       - op: check
///         path: /kind
///         value: Deployment
///     patch:
///       - op: replace
///         path: /spec/replicas
///         value: 2
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultProcessorOptions {
    pub add_namespace: AddNamespace,
    pub namespaced_filter: BoolFilter,
    pub hook_filter: BoolFilter,
    /// Hook tokens that must all appear for a resource to count as a hook
    pub hook_filter_list: Option<Vec<String>>,
    pub jsonpatches: Vec<JsonPatchRule>,
    #[serde(skip)]
    pub filterfunc: Option<ChartPredicate>,
}

impl fmt::Debug for DefaultProcessorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultProcessorOptions")
            .field("add_namespace", &self.add_namespace)
            .field("namespaced_filter", &self.namespaced_filter)
            .field("hook_filter", &self.hook_filter)
            .field("hook_filter_list", &self.hook_filter_list)
            .field("jsonpatches", &self.jsonpatches)
            .field("filterfunc", &self.filterfunc.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Namespace injection, namespace/hook filtering and conditional JSON patches
#[derive(Debug, Clone, Default)]
pub struct DefaultProcessor {
    options: DefaultProcessorOptions,
}

impl DefaultProcessor {
    pub fn new(options: DefaultProcessorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DefaultProcessorOptions {
        &self.options
    }

    pub fn add_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.add_namespace = AddNamespace::Name(namespace.into());
        self
    }

    pub fn inherit_namespace(mut self) -> Self {
        self.options.add_namespace = AddNamespace::Inherit(true);
        self
    }

    pub fn namespaced_filter(mut self, filter: BoolFilter) -> Self {
        self.options.namespaced_filter = filter;
        self
    }

    pub fn hook_filter(mut self, filter: BoolFilter) -> Self {
        self.options.hook_filter = filter;
        self
    }

    pub fn hook_filter_list<I, S>(mut self, hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.hook_filter_list = Some(hooks.into_iter().map(Into::into).collect());
        self
    }

    pub fn jsonpatch(mut self, rule: JsonPatchRule) -> Self {
        self.options.jsonpatches.push(rule);
        self
    }

    pub fn filterfunc<F>(mut self, func: F) -> Self
    where
        F: Fn(&Chart, &Resource) -> Result<bool> + Send + Sync + 'static,
    {
        self.options.filterfunc = Some(std::sync::Arc::new(func));
        self
    }

    fn is_hook(&self, resource: &Resource) -> bool {
        let Some(value) = resource::annotations(resource).and_then(|a| a.get(HOOK_ANNOTATION))
        else {
            return false;
        };
        let Some(required) = &self.options.hook_filter_list else {
            return true;
        };

        let present: Vec<&str> = value
            .as_str()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .collect();
        required.iter().all(|hook| present.contains(&hook.as_str()))
    }
}

impl Processor for DefaultProcessor {
    fn filter(&self, chart: &Chart, resource: &Resource) -> Result<bool> {
        if !self
            .options
            .namespaced_filter
            .accepts(resource::is_namespaced_resource(resource))
        {
            return Ok(false);
        }
        if !self.options.hook_filter.accepts(self.is_hook(resource)) {
            return Ok(false);
        }
        match &self.options.filterfunc {
            Some(func) => func(chart, resource),
            None => Ok(true),
        }
    }

    fn mutate(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        if let Some(namespace) = self.options.add_namespace.resolve(chart)?
            && resource::is_namespaced_resource(resource)
            && resource::namespace(resource).is_none()
        {
            set_namespace(resource, namespace)?;
        }

        for rule in &self.options.jsonpatches {
            rule.apply(resource)?;
        }
        Ok(())
    }
}

fn set_namespace(resource: &mut Resource, namespace: String) -> Result<()> {
    let Some(obj) = resource.as_object_mut() else {
        return Err(CoreError::parameter("resource is not a mapping"));
    };
    let metadata = obj
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if metadata.is_null() {
        *metadata = Value::Object(Map::new());
    }
    let Some(metadata) = metadata.as_object_mut() else {
        return Err(CoreError::configuration("resource metadata is not a mapping"));
    };
    metadata.insert("namespace".to_string(), Value::String(namespace));
    Ok(())
}
