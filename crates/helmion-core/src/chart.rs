//! Chart stream model
//!
//! A [`Chart`] is an ordered sequence of rendered resources plus the
//! configuration that drives processing. Charts are never modified by
//! [`Chart::process`], [`Chart::split`] or [`Chart::sort`]: each returns new
//! charts holding deep copies.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::ChartConfiguration;
use crate::error::{CoreError, Result};
use crate::processor::Processor;
use crate::request::TemplateRequest;
use crate::resource::{self, Resource};
use crate::splitter::{CategoryResult, Splitter};
use crate::yaml;

/// Rendered chart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    config: Arc<ChartConfiguration>,
    request: Option<Arc<TemplateRequest>>,
    resources: Vec<Resource>,
}

impl Chart {
    pub fn new(config: ChartConfiguration) -> Self {
        Self {
            config: Arc::new(config),
            request: None,
            resources: Vec::new(),
        }
    }

    /// Parse a multi-document YAML stream into a chart
    pub fn from_yaml(config: ChartConfiguration, content: &str) -> Result<Self> {
        let documents = yaml::load_yaml_all(content)?;
        Ok(Self::new(config).with_resources(documents))
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    /// Bind the request this chart was rendered from
    pub fn with_request(mut self, request: TemplateRequest) -> Self {
        self.request = Some(Arc::new(request));
        self
    }

    pub fn config(&self) -> &ChartConfiguration {
        &self.config
    }

    pub fn request(&self) -> Option<&TemplateRequest> {
        self.request.as_deref()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Same configuration and request, no resources
    pub fn clone_empty(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            request: self.request.clone(),
            resources: Vec::new(),
        }
    }

    /// Copy of this chart, with or without its resources
    pub fn clone_with(&self, clone_data: bool) -> Self {
        if clone_data {
            self.clone()
        } else {
            self.clone_empty()
        }
    }

    /// Run a processor over every resource and return the new chart
    pub fn process(&self, processor: &dyn Processor) -> Result<Chart> {
        let mut chart = self.clone_empty();

        for source in &self.resources {
            let mut resource = source.clone();

            if self.config.parse_list_resource && resource::is_list_resource(&resource) {
                if let Some(list) = process_list(&chart, processor, resource)? {
                    chart.resources.push(list);
                }
                continue;
            }

            processor.mutate_before(&chart, &mut resource)?;
            if !processor.filter(&chart, &resource)? {
                continue;
            }
            processor.mutate(&chart, &mut resource)?;
            chart.resources.push(resource);
        }

        if let Some(resources) = processor.mutate_complete(&chart, &chart.resources)? {
            chart.resources = resources;
        }

        tracing::debug!(
            input = self.resources.len(),
            output = chart.resources.len(),
            "processed chart"
        );
        Ok(chart)
    }

    /// Like [`Chart::process`], passing the chart through when there is no processor
    pub fn process_optional(self, processor: Option<&dyn Processor>) -> Result<Chart> {
        match processor {
            Some(processor) => self.process(processor),
            None => Ok(self),
        }
    }

    /// Split into one chart per category
    pub fn split(&self, splitter: &dyn Splitter) -> Result<IndexMap<String, Chart>> {
        self.split_with(splitter, &[])
    }

    /// Split, making sure every name in `ensure_categories` has a chart
    pub fn split_with(
        &self,
        splitter: &dyn Splitter,
        ensure_categories: &[&str],
    ) -> Result<IndexMap<String, Chart>> {
        let mut charts: IndexMap<String, Chart> = IndexMap::new();
        for name in ensure_categories.iter().map(|s| s.to_string()) {
            charts.entry(name).or_insert_with(|| self.clone_empty());
        }
        for name in splitter.category_list().unwrap_or_default() {
            charts.entry(name).or_insert_with(|| self.clone_empty());
        }

        let mut all = Vec::new();
        for resource in &self.resources {
            match splitter.category(self, resource)? {
                CategoryResult::All => all.push(resource),
                CategoryResult::Categories(names) => {
                    let mut seen: Vec<&str> = Vec::with_capacity(names.len());
                    for name in &names {
                        if name.is_empty() {
                            return Err(CoreError::parameter(format!(
                                "empty category name returned for {}",
                                resource::describe(resource)
                            )));
                        }
                        if seen.contains(&name.as_str()) {
                            continue;
                        }
                        seen.push(name);
                        charts
                            .entry(name.clone())
                            .or_insert_with(|| self.clone_empty())
                            .resources
                            .push(resource.clone());
                    }
                }
                CategoryResult::None | CategoryResult::Skip => {}
            }
        }

        for chart in charts.values_mut() {
            chart.resources.extend(all.iter().map(|r| (*r).clone()));
        }

        Ok(charts)
    }

    /// Sort each run of same-kind resources by name
    ///
    /// The order between kinds is kept as rendered.
    pub fn sort(&self) -> Chart {
        let mut chart = self.clone_empty();
        let mut run: Vec<Resource> = Vec::new();

        for resource in &self.resources {
            if let Some(last) = run.last()
                && resource::kind(last) != resource::kind(resource)
            {
                flush_run(&mut run, &mut chart.resources);
            }
            run.push(resource.clone());
        }
        flush_run(&mut run, &mut chart.resources);

        chart
    }

    /// Dump as a multi-document YAML stream
    pub fn to_yaml(&self) -> Result<String> {
        yaml::dump_yaml_all(&self.resources)
    }
}

impl<'a> IntoIterator for &'a Chart {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

fn flush_run(run: &mut Vec<Resource>, out: &mut Vec<Resource>) {
    run.sort_by(|a, b| resource::name(a).cmp(&resource::name(b)));
    out.append(run);
}

/// Process the items of a `List`; `None` when no item survives
fn process_list(
    chart: &Chart,
    processor: &dyn Processor,
    mut list: Resource,
) -> Result<Option<Resource>> {
    let items = match list.get_mut("items").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut kept = Vec::with_capacity(items.len());
    for mut item in items {
        processor.mutate_before(chart, &mut item)?;
        if !processor.filter(chart, &item)? {
            continue;
        }
        processor.mutate(chart, &mut item)?;
        kept.push(item);
    }

    if kept.is_empty() {
        return Ok(None);
    }
    list["items"] = Value::Array(kept);
    Ok(Some(list))
}
