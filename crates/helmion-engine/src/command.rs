//! Template engine command lines
//!
//! The mapping from a [`TemplateRequest`] to engine flags lives here and
//! nowhere else. Wrappers or alternate engines implement [`CommandBuilder`];
//! the output parsing contract stays the same.

use std::path::Path;

use helmion_core::{CoreError, TemplateRequest};
use serde_json::Value;

use crate::error::Result;

/// Builds the argument vector for one render
pub trait CommandBuilder: Send + Sync {
    /// Full argv, program first
    fn build(&self, request: &TemplateRequest, values_file: Option<&Path>) -> Result<Vec<String>>;
}

/// `helm template` command line
#[derive(Debug, Clone, Copy, Default)]
pub struct HelmCommand;

impl CommandBuilder for HelmCommand {
    fn build(&self, request: &TemplateRequest, values_file: Option<&Path>) -> Result<Vec<String>> {
        let options = &request.options;
        let mut args = vec![
            options.command.clone(),
            "template".to_string(),
            request.release_name.clone(),
            request.chart.clone(),
        ];

        if options.debug {
            args.push("--debug".to_string());
        }
        if options.include_crds {
            args.push("--include-crds".to_string());
        }
        if let Some(repository) = &request.repository {
            args.extend(["--repo".to_string(), repository.clone()]);
        }
        if let Some(namespace) = &request.namespace {
            args.extend(["--namespace".to_string(), namespace.clone()]);
        }
        if let Some(version) = &request.version {
            args.extend(["--version".to_string(), version.clone()]);
        }
        if let Some(kube_version) = &options.kube_version {
            args.extend(["--kube-version".to_string(), kube_version.clone()]);
        }
        for api_version in &options.api_versions {
            args.extend(["--api-versions".to_string(), api_version.clone()]);
        }
        for (key, value) in &request.sets {
            args.extend(["--set".to_string(), format!("{}={}", key, set_value(key, value)?)]);
        }
        if let Some(path) = values_file {
            args.extend(["--values".to_string(), path.display().to_string()]);
        }

        Ok(args)
    }
}

/// Render a scalar for `--set`, escaping the engine's list separator
///
/// Passed as a bare `k=v` argv entry: no shell is involved, so no quoting.
fn set_value(key: &str, value: &Value) -> Result<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => {
            return Err(CoreError::parameter(format!(
                "set '{}' must be a scalar, got {}",
                key, value
            ))
            .into());
        }
    };
    Ok(text.replace(',', "\\,"))
}

/// Shell-quoted command line, for logs and error messages only
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+^~".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
