//! Values handling with deep merge support

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Deep merge `overlay` into `base`
///
/// Rules:
/// - Objects: recursive merge
/// - Scalars and arrays: overlay replaces base
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a value by dotted path (e.g. `image.tag`), creating objects on the way
pub fn set_path(value: &mut Value, path: &str, new_value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    set_nested(value, &parts, new_value);
}

/// Get a value by dotted path
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

fn set_nested(value: &mut Value, path: &[&str], new_value: Value) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    if let Value::Object(map) = value {
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        set_nested(entry, remaining, new_value);
    }
}

/// Split a `key=value` override, keeping the value text as typed
pub fn split_set_arg(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=').ok_or_else(|| {
        CoreError::parameter(format!("invalid --set format: '{}', expected key=value", arg))
    })
}

/// Parse a `key=value` override into its path and a typed scalar
pub fn parse_set_value(arg: &str) -> Result<(String, Value)> {
    let (key, val) = split_set_arg(arg)?;

    let value = if val == "true" {
        Value::Bool(true)
    } else if val == "false" {
        Value::Bool(false)
    } else if val == "null" {
        Value::Null
    } else if let Ok(num) = val.parse::<i64>() {
        Value::Number(num.into())
    } else if let Some(num) = val.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Value::Number(num)
    } else {
        Value::String(val.to_string())
    };

    Ok((key.to_string(), value))
}
