//! External template engine execution

use std::process::Stdio;

use helmion_core::yaml::{dump_yaml, load_yaml_all};
use helmion_core::{Chart, ChartConfiguration, Resource, TemplateRequest};
use serde_json::Value;
use tempfile::TempDir;
use tokio::process::Command;

use crate::command::{CommandBuilder, HelmCommand, display_command};
use crate::error::{EngineError, Result};

const VALUES_FILE_NAME: &str = "values.yaml";

/// Renders template requests into charts by running the template engine
///
/// The engine is an opaque collaborator: a command line goes in, a
/// multi-document YAML stream comes out on stdout.
pub struct TemplateRenderer {
    config: ChartConfiguration,
    builder: Box<dyn CommandBuilder>,
}

impl TemplateRenderer {
    pub fn new(config: ChartConfiguration) -> Self {
        Self {
            config,
            builder: Box::new(HelmCommand),
        }
    }

    /// Replace the command line mapping, e.g. for a wrapper script
    pub fn with_command_builder(mut self, builder: impl CommandBuilder + 'static) -> Self {
        self.builder = Box::new(builder);
        self
    }

    pub fn config(&self) -> &ChartConfiguration {
        &self.config
    }

    /// Run the engine and wrap its output in a chart bound to `request`
    pub async fn render(&self, request: &TemplateRequest) -> Result<Chart> {
        // Held until the process exits; dropping it removes the values file
        let values_dir = if request.values.is_empty() {
            None
        } else {
            Some(write_values_file(&request.values)?)
        };
        let values_path = values_dir.as_ref().map(|dir| dir.path().join(VALUES_FILE_NAME));

        let argv = self.builder.build(request, values_path.as_deref())?;
        let stdout = run(&argv).await?;
        drop(values_dir);

        let resources = parse_output(&display_command(&argv), &stdout)?;
        tracing::debug!(
            chart = %request.chart,
            release = %request.release_name,
            resources = resources.len(),
            "rendered chart"
        );

        Ok(Chart::new(self.config.clone())
            .with_request(request.clone())
            .with_resources(resources))
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(ChartConfiguration::default())
    }
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn write_values_file(values: &serde_json::Map<String, Value>) -> Result<TempDir> {
    let content = dump_yaml(&Value::Object(values.clone()))?;
    let dir = tempfile::Builder::new()
        .prefix("helmion-")
        .tempdir()
        .map_err(|source| EngineError::ValuesFile { source })?;
    std::fs::write(dir.path().join(VALUES_FILE_NAME), content)
        .map_err(|source| EngineError::ValuesFile { source })?;
    Ok(dir)
}

async fn run(argv: &[String]) -> Result<String> {
    let command = display_command(argv);
    let Some((program, args)) = argv.split_first() else {
        return Err(helmion_core::CoreError::parameter("empty template engine command").into());
    };

    tracing::debug!(%command, "running template engine");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| EngineError::Spawn {
            command: command.clone(),
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(EngineError::CommandFailed {
            command,
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| EngineError::InvalidEncoding { command })
}

/// Parse engine stdout; every non-empty document must be a mapping
pub fn parse_output(command: &str, stdout: &str) -> Result<Vec<Resource>> {
    let documents = load_yaml_all(stdout).map_err(|e| EngineError::OutputParse {
        command: command.to_string(),
        message: e.to_string(),
        stdout: stdout.to_string(),
    })?;

    for (index, document) in documents.iter().enumerate() {
        if !document.is_object() {
            return Err(EngineError::NotAMapping {
                index,
                document: document.to_string(),
            });
        }
    }
    Ok(documents)
}
