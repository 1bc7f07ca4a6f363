//! Helmion CLI - render, process and split Helm charts

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::template::TemplateArgs;
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "helmion")]
#[command(version)]
#[command(about = "Render, process and split Helm charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a chart with the template engine and post-process the result
    Template(TemplateArgs),

    /// List the published versions of a chart
    Versions {
        /// Repository URL or local directory holding index.yaml
        repo: String,

        /// Chart name
        chart: String,

        /// Show at most this many versions
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show chart values merged with those of its dependencies
    Values {
        /// Repository URL or local directory holding index.yaml
        repo: String,

        /// Chart name
        chart: String,

        /// Version or version constraint (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Only the chart's own values.yaml
        #[arg(long)]
        no_dependencies: bool,
    },

    /// Resolve and list a chart's dependencies
    Dependencies {
        /// Repository URL or local directory holding index.yaml
        repo: String,

        /// Chart name
        chart: String,

        /// Version or version constraint (default: latest)
        #[arg(long)]
        version: Option<String>,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::internal(e.to_string()))?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Template(args) => commands::template::run(&args).await,

            Commands::Versions { repo, chart, limit } => {
                commands::versions::run(&repo, &chart, limit).await
            }

            Commands::Values {
                repo,
                chart,
                version,
                no_dependencies,
            } => commands::values::run(&repo, &chart, version.as_deref(), no_dependencies).await,

            Commands::Dependencies {
                repo,
                chart,
                version,
            } => commands::dep::list(&repo, &chart, version.as_deref()).await,
        }
    })
}
