//! Helmion Engine - external template engine driver
//!
//! Turns a [`TemplateRequest`](helmion_core::TemplateRequest) into a
//! [`Chart`](helmion_core::Chart) by running the template engine
//! (`helm template` by default) and parsing its multi-document output.
//!
//! ```no_run
//! use helmion_core::{ChartConfiguration, TemplateRequest};
//! use helmion_engine::TemplateRenderer;
//!
//! # async fn example() -> helmion_engine::Result<()> {
//! let request = TemplateRequest::new("nginx", "web")
//!     .with_repository("https://charts.bitnami.com/bitnami")
//!     .with_namespace("frontend");
//! let chart = TemplateRenderer::new(ChartConfiguration::default())
//!     .render(&request)
//!     .await?;
//! println!("{}", chart.to_yaml()?);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod renderer;

pub use command::{CommandBuilder, HelmCommand, display_command};
pub use error::{EngineError, Result};
pub use renderer::{TemplateRenderer, parse_output};
