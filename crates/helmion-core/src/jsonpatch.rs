//! JSON Patch with extensions
//!
//! Standard RFC 6902 operations are delegated to `json-patch`. Two extra
//! operations are understood:
//!
//! - `check`: like `test`, with an optional `cmp` (`equals`, `startswith`,
//!   `endswith`, `contains`). Used to build conditions.
//! - `merge`: deep-merge `value` into the object found at `path`.
//!
//! ```yaml
//! - op: check
//!   path: /kind
//!   value: Deployment
//! - op: merge
//!   path: /metadata/labels
//!   value: {team: core}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::resource::{self, Resource};
use crate::values::deep_merge;

pub use json_patch::PatchOperation;

/// Comparison used by the `check` operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckComparison {
    #[default]
    Equals,
    StartsWith,
    EndsWith,
    Contains,
}

/// One operation of an extended patch document
#[derive(Debug, Clone)]
pub enum ExtendedOperation {
    Standard(PatchOperation),
    Check {
        path: String,
        value: Value,
        cmp: CheckComparison,
    },
    Merge {
        path: String,
        value: Value,
    },
}

impl ExtendedOperation {
    fn from_value(op: &Value) -> Result<Self> {
        let name = op.get("op").and_then(Value::as_str).ok_or_else(|| {
            CoreError::configuration(format!("patch operation without 'op': {}", op))
        })?;

        match name {
            "check" | "merge" => {
                let path = op.get("path").and_then(Value::as_str).ok_or_else(|| {
                    CoreError::configuration(format!("'{}' operation requires a path", name))
                })?;
                let value = op.get("value").cloned().unwrap_or(Value::Null);
                if name == "merge" {
                    return Ok(Self::Merge {
                        path: path.to_string(),
                        value,
                    });
                }
                let cmp = match op.get("cmp") {
                    Some(cmp) => serde_json::from_value(cmp.clone()).map_err(|e| {
                        CoreError::configuration(format!("invalid check comparison: {}", e))
                    })?,
                    None => CheckComparison::default(),
                };
                Ok(Self::Check {
                    path: path.to_string(),
                    value,
                    cmp,
                })
            }
            _ => serde_json::from_value(op.clone())
                .map(Self::Standard)
                .map_err(|e| CoreError::configuration(format!("invalid patch operation: {}", e))),
        }
    }

    fn apply(&self, target: &mut Value) -> std::result::Result<(), String> {
        match self {
            Self::Standard(op) => {
                json_patch::patch(target, std::slice::from_ref(op)).map_err(|e| e.to_string())
            }
            Self::Check { path, value, cmp } => {
                let found = target
                    .pointer(path)
                    .ok_or_else(|| format!("check failed: path '{}' not found", path))?;
                if check(found, value, *cmp) {
                    Ok(())
                } else {
                    Err(format!("check failed at '{}'", path))
                }
            }
            Self::Merge { path, value } => {
                let found = target
                    .pointer_mut(path)
                    .ok_or_else(|| format!("merge failed: path '{}' not found", path))?;
                deep_merge(found, value);
                Ok(())
            }
        }
    }
}

fn check(found: &Value, expected: &Value, cmp: CheckComparison) -> bool {
    match cmp {
        CheckComparison::Equals => found == expected,
        CheckComparison::StartsWith => match (found.as_str(), expected.as_str()) {
            (Some(f), Some(e)) => f.starts_with(e),
            _ => false,
        },
        CheckComparison::EndsWith => match (found.as_str(), expected.as_str()) {
            (Some(f), Some(e)) => f.ends_with(e),
            _ => false,
        },
        CheckComparison::Contains => match found {
            Value::String(f) => expected.as_str().is_some_and(|e| f.contains(e)),
            Value::Array(items) => items.contains(expected),
            Value::Object(map) => expected.as_str().is_some_and(|e| map.contains_key(e)),
            _ => false,
        },
    }
}

/// An ordered list of extended patch operations
#[derive(Debug, Clone, Default)]
pub struct PatchDocument(pub Vec<ExtendedOperation>);

impl PatchDocument {
    /// Parse from a JSON array of operations
    pub fn from_value(value: &Value) -> Result<Self> {
        let ops = value.as_array().ok_or_else(|| {
            CoreError::configuration("a patch document must be a list of operations")
        })?;
        ops.iter()
            .map(ExtendedOperation::from_value)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Single `check` operation, the common condition form
    pub fn check(path: impl Into<String>, value: Value) -> Self {
        Self(vec![ExtendedOperation::Check {
            path: path.into(),
            value,
            cmp: CheckComparison::Equals,
        }])
    }

    /// Apply every operation in place; stops at the first failure
    pub fn apply(&self, target: &mut Value) -> std::result::Result<(), String> {
        for op in &self.0 {
            op.apply(target)?;
        }
        Ok(())
    }

    /// True if the whole document applies cleanly to a scratch copy
    pub fn holds(&self, target: &Value) -> bool {
        let mut scratch = target.clone();
        self.apply(&mut scratch).is_ok()
    }
}

impl<'de> Deserialize<'de> for PatchDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Predicate closure over a resource
pub type ResourcePredicate = Arc<dyn Fn(&Resource) -> Result<bool> + Send + Sync>;

/// Gate for a [`JsonPatchRule`]
#[derive(Clone)]
pub enum Condition {
    /// Holds when every operation of the document succeeds
    Patch(PatchDocument),
    Func(ResourcePredicate),
}

impl Condition {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Resource) -> Result<bool> + Send + Sync + 'static,
    {
        Self::Func(Arc::new(f))
    }

    pub fn evaluate(&self, resource: &Resource) -> Result<bool> {
        match self {
            Self::Patch(doc) => Ok(doc.holds(resource)),
            Self::Func(f) => f(resource),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch(doc) => f.debug_tuple("Patch").field(doc).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PatchDocument::deserialize(deserializer).map(Self::Patch)
    }
}

/// Conditional patch applied by the default processor
///
/// `condition` gates first, then at least one of `conditions` must hold.
/// `patch` runs before the ordered `patches`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonPatchRule {
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub patch: Option<PatchDocument>,
    #[serde(default)]
    pub patches: Vec<PatchDocument>,
}

impl JsonPatchRule {
    pub fn new(patch: PatchDocument) -> Self {
        Self {
            patch: Some(patch),
            ..Default::default()
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn when_any(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn matches(&self, resource: &Resource) -> Result<bool> {
        if let Some(condition) = &self.condition
            && !condition.evaluate(resource)?
        {
            return Ok(false);
        }
        if !self.conditions.is_empty() {
            for condition in &self.conditions {
                if condition.evaluate(resource)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Patch the resource if the rule matches; returns whether it did
    pub fn apply(&self, resource: &mut Resource) -> Result<bool> {
        if !self.matches(resource)? {
            return Ok(false);
        }

        let target = resource::describe(resource);
        for doc in self.patch.iter().chain(self.patches.iter()) {
            doc.apply(resource).map_err(|message| CoreError::Patch {
                resource: target.clone(),
                message,
            })?;
        }
        Ok(true)
    }
}
