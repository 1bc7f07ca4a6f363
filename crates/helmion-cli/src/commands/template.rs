//! Template command - render a chart and post-process the manifests

use clap::Args;
use helmion_core::processors::AddNamespace;
use helmion_core::values::{deep_merge, split_set_arg};
use helmion_core::yaml::load_yaml_file;
use helmion_core::{
    Chart, ChartConfiguration, CoreError, DefaultProcessor, DefaultProcessorOptions,
    EngineOptions, FilterCRDs, FilterRemoveHelmData, ProcessorChain, ProcessorSplitter,
    SplitOptions, TemplateRequest,
};
use helmion_engine::TemplateRenderer;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::display;
use crate::error::{CliError, Result};

const CRDS_CATEGORY: &str = "crds";
const TEMPLATES_CATEGORY: &str = "templates";
const MANIFEST_CATEGORY: &str = "manifest";

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Release name
    pub release: String,

    /// Chart name, or a chart reference the engine understands
    pub chart: String,

    /// Chart repository URL
    #[arg(long)]
    pub repo: Option<String>,

    /// Chart version or constraint
    #[arg(long)]
    pub version: Option<String>,

    /// Target namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Values file(s), merged in order
    #[arg(short = 'f', long = "values")]
    pub values: Vec<PathBuf>,

    /// Set values on command line (key=value)
    #[arg(long = "set")]
    pub set: Vec<String>,

    /// Template engine binary
    #[arg(long, env = "HELMION_ENGINE", default_value = "helm")]
    pub engine: String,

    /// Pass --debug to the template engine
    #[arg(long)]
    pub engine_debug: bool,

    /// Render CRDs too
    #[arg(long)]
    pub include_crds: bool,

    /// Kubernetes version used for capabilities
    #[arg(long)]
    pub kube_version: Option<String>,

    /// API versions available for capabilities
    #[arg(long = "api-versions")]
    pub api_versions: Vec<String>,

    /// YAML file with processor options (namespace, filters, jsonpatches)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Set the release namespace on namespaced resources lacking one
    #[arg(long)]
    pub add_namespace: bool,

    /// Strip labels and annotations added by Helm
    #[arg(long)]
    pub remove_helm_data: bool,

    /// Descend into List resources
    #[arg(long)]
    pub parse_lists: bool,

    /// Sort resources by name within each run of the same kind
    #[arg(long)]
    pub sort: bool,

    /// Split the output into CRDs and everything else
    #[arg(long)]
    pub split_crds: bool,

    /// Write one file per category into this directory instead of stdout
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub async fn run(args: &TemplateArgs) -> Result<()> {
    let config = ChartConfiguration::new().with_parse_list_resource(args.parse_lists);
    let request = build_request(args)?;

    let chart = TemplateRenderer::new(config).render(&request).await?;
    let chart = chart.process(&processors(args)?)?;
    let chart = if args.sort { chart.sort() } else { chart };

    let outputs = categories(&chart, args.split_crds)?;
    match &args.output_dir {
        Some(dir) => write_outputs(dir, &outputs),
        None => {
            print!("{}", render_stdout(&outputs, args.split_crds)?);
            Ok(())
        }
    }
}

fn build_request(args: &TemplateArgs) -> Result<TemplateRequest> {
    let mut request = TemplateRequest::new(&args.chart, &args.release).with_options(EngineOptions {
        command: args.engine.clone(),
        debug: args.engine_debug,
        include_crds: args.include_crds,
        kube_version: args.kube_version.clone(),
        api_versions: args.api_versions.clone(),
    });

    if let Some(repo) = &args.repo {
        request = request.with_repository(repo);
    }
    if let Some(version) = &args.version {
        request = request.with_version(version);
    }
    if let Some(namespace) = &args.namespace {
        request = request.with_namespace(namespace);
    }

    let mut values = Value::Object(Default::default());
    for path in &args.values {
        let file_values = load_yaml_file(path)?;
        if !file_values.is_object() && !file_values.is_null() {
            return Err(CoreError::parameter(format!(
                "values file {} must contain a mapping",
                path.display()
            ))
            .into());
        }
        deep_merge(&mut values, &file_values);
    }
    if let Value::Object(map) = values
        && !map.is_empty()
    {
        request = request.with_values(map);
    }

    // The engine applies its own typing to --set values
    for arg in &args.set {
        let (key, value) = split_set_arg(arg)?;
        request = request.with_set(key, value)?;
    }

    Ok(request)
}

fn processors(args: &TemplateArgs) -> Result<ProcessorChain> {
    let mut options = match &args.config {
        Some(path) => {
            let value = load_yaml_file(path)?;
            serde_json::from_value::<DefaultProcessorOptions>(value).map_err(|e| {
                CoreError::configuration(format!("invalid config {}: {}", path.display(), e))
            })?
        }
        None => DefaultProcessorOptions::default(),
    };
    if args.add_namespace {
        options.add_namespace = AddNamespace::Inherit(true);
    }

    let mut chain = ProcessorChain::new().with(DefaultProcessor::new(options));
    if args.remove_helm_data {
        chain = chain.with(FilterRemoveHelmData::new());
    }
    Ok(chain)
}

fn categories(chart: &Chart, split_crds: bool) -> Result<Vec<(String, Chart)>> {
    if !split_crds {
        return Ok(vec![(MANIFEST_CATEGORY.to_string(), chart.clone())]);
    }

    let splitter = ProcessorSplitter::new(SplitOptions {
        exactly_one_category: true,
        ..Default::default()
    })
    .with_category(CRDS_CATEGORY, FilterCRDs::new())
    .with_category(TEMPLATES_CATEGORY, FilterCRDs::inverted());

    Ok(chart
        .split_with(&splitter, &[CRDS_CATEGORY, TEMPLATES_CATEGORY])?
        .into_iter()
        .collect())
}

fn render_stdout(outputs: &[(String, Chart)], with_headers: bool) -> Result<String> {
    let mut out = String::new();
    for (name, chart) in outputs {
        if with_headers {
            out.push_str("---\n");
            out.push_str(&display::category_header(name));
            out.push('\n');
        }
        out.push_str(&chart.to_yaml()?);
    }
    Ok(out)
}

fn write_outputs(dir: &Path, outputs: &[(String, Chart)]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;

    for (name, chart) in outputs {
        let path = dir.join(format!("{}.yaml", name));
        fs::write(&path, chart.to_yaml()?).map_err(|e| CliError::io(&path, e))?;
        display::print_wrote(&path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: TemplateArgs,
    }

    fn parse(argv: &[&str]) -> TemplateArgs {
        Harness::parse_from(std::iter::once("template").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_build_request_from_flags() {
        let args = parse(&[
            "web",
            "nginx",
            "--repo",
            "https://charts.example.com",
            "-n",
            "frontend",
            "--set",
            "replicaCount=3",
            "--set",
            "image.tag=1.25",
            "--api-versions",
            "monitoring.coreos.com/v1",
        ]);

        let request = build_request(&args).unwrap();

        assert_eq!(request.chart, "nginx");
        assert_eq!(request.release_name, "web");
        assert_eq!(request.namespace.as_deref(), Some("frontend"));
        assert_eq!(request.sets["replicaCount"], serde_json::json!("3"));
        assert_eq!(request.sets["image.tag"], serde_json::json!("1.25"));
        assert_eq!(request.options.api_versions, vec!["monitoring.coreos.com/v1"]);
        assert!(request.values.is_empty());
    }

    #[test]
    fn test_set_values_reach_engine_as_typed() {
        use helmion_engine::{CommandBuilder, HelmCommand};

        let args = parse(&[
            "web",
            "nginx",
            "--set",
            "image.tag=1.10",
            "--set",
            "zip=007",
        ]);
        let argv = HelmCommand.build(&build_request(&args).unwrap(), None).unwrap();

        assert_eq!(
            argv,
            vec![
                "helm",
                "template",
                "web",
                "nginx",
                "--set",
                "image.tag=1.10",
                "--set",
                "zip=007"
            ]
        );
    }

    #[test]
    fn test_values_files_merge_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let base = dir.path().join("base.yaml");
        let prod = dir.path().join("prod.yaml");
        fs::write(&base, "image:\n  repository: nginx\n  tag: \"1.0\"\nreplicaCount: 1\n").unwrap();
        fs::write(&prod, "image:\n  tag: \"2.0\"\n").unwrap();

        let args = parse(&[
            "web",
            "nginx",
            "-f",
            base.to_str().unwrap(),
            "-f",
            prod.to_str().unwrap(),
        ]);
        let request = build_request(&args).unwrap();

        assert_eq!(
            Value::Object(request.values),
            serde_json::json!({
                "image": {"repository": "nginx", "tag": "2.0"},
                "replicaCount": 1
            })
        );
    }

    #[test]
    fn test_split_crds_categories() {
        let chart = Chart::from_yaml(
            ChartConfiguration::default(),
            "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nmetadata:\n  name: widgets.example.com\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n",
        )
        .unwrap();

        let outputs = categories(&chart, true).unwrap();

        let names: Vec<&str> = outputs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![CRDS_CATEGORY, TEMPLATES_CATEGORY]);
        assert_eq!(outputs[0].1.len(), 1);
        assert_eq!(outputs[1].1.len(), 1);

        let stdout = render_stdout(&outputs, true).unwrap();
        assert!(stdout.starts_with("---\n# helmion category: crds\n"));
    }
}
