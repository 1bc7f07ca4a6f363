//! YAML load and dump
//!
//! Documents are read into `serde_json::Value` built with `preserve_order`,
//! so dumping a loaded document keeps its key order.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Parse a single YAML document
pub fn load_yaml(content: &str) -> Result<Value> {
    Ok(serde_yaml::from_str(content)?)
}

/// Parse a multi-document YAML stream, skipping empty documents
pub fn load_yaml_all(content: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Read and parse a single-document YAML file
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::input_output(format!("failed to read {}: {}", path.display(), e))
    })?;
    load_yaml(&content)
}

/// Serialize a value as one YAML document
pub fn dump_yaml(value: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

/// Serialize values as a `---` separated YAML stream
pub fn dump_yaml_all<'a, I>(values: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&dump_yaml(value)?);
    }
    Ok(out)
}
