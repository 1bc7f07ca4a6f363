//! Helmion Core - chart stream model for rendered Kubernetes manifests
//!
//! This crate holds everything that works on already rendered resources:
//! - `resource`: classification of Kubernetes objects
//! - `yaml`: single and multi-document YAML I/O
//! - `Chart`: ordered resource stream with `process`, `split` and `sort`
//! - `Processor` / `Splitter`: the transformation contracts
//! - `processors`: built-in processors (namespace injection, CRD filter, Helm data removal)
//! - `jsonpatch`: JSON Patch with the `check` and `merge` extensions

pub mod chart;
pub mod config;
pub mod error;
pub mod jsonpatch;
pub mod processor;
pub mod processors;
pub mod request;
pub mod resource;
pub mod splitter;
pub mod values;
pub mod yaml;

pub use chart::Chart;
pub use config::ChartConfiguration;
pub use error::{CoreError, ErrorKind, Result};
pub use jsonpatch::{CheckComparison, Condition, JsonPatchRule, PatchDocument};
pub use processor::{IdentityProcessor, Processor, ProcessorChain};
pub use processors::{
    AddNamespace, BoolFilter, DefaultProcessor, DefaultProcessorOptions, FilterCRDs,
    FilterRemoveHelmData,
};
pub use request::{EngineOptions, TemplateRequest};
pub use resource::{Resource, ResourceSpec};
pub use splitter::{
    CategoryResult, FnSplitter, ListSplitter, ProcessorSplitter, SplitOptions, Splitter,
    SplitterChain,
};
