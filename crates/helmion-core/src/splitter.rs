//! Splitter contract and the declarative splitters
//!
//! A splitter classifies each resource of a chart into zero or more named
//! categories. [`Chart::split`] turns the classification into one chart per
//! category.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::chart::Chart;
use crate::error::{CoreError, Result};
use crate::processor::Processor;
use crate::resource::{self, Resource};

/// Outcome of classifying one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryResult {
    /// Drop the resource from every category
    None,
    /// Copy into every category of the split
    All,
    /// Let the next splitter of a chain decide; dropped when last
    Skip,
    /// Copy into the named categories
    Categories(Vec<String>),
}

impl CategoryResult {
    pub fn categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CategoryResult::Categories(names.into_iter().map(Into::into).collect())
    }
}

/// Resource classifier
pub trait Splitter: Send + Sync {
    fn category(&self, chart: &Chart, resource: &Resource) -> Result<CategoryResult>;

    /// Categories known before any resource is seen
    fn category_list(&self) -> Option<Vec<String>> {
        None
    }
}

impl<S: Splitter + ?Sized> Splitter for Box<S> {
    fn category(&self, chart: &Chart, resource: &Resource) -> Result<CategoryResult> {
        (**self).category(chart, resource)
    }

    fn category_list(&self) -> Option<Vec<String>> {
        (**self).category_list()
    }
}

/// First non-`Skip` answer wins
#[derive(Default)]
pub struct SplitterChain {
    splitters: Vec<Box<dyn Splitter>>,
}

impl SplitterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, splitter: impl Splitter + 'static) -> Self {
        self.splitters.push(Box::new(splitter));
        self
    }

    pub fn push(&mut self, splitter: Box<dyn Splitter>) {
        self.splitters.push(splitter);
    }
}

impl std::fmt::Debug for SplitterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitterChain")
            .field("splitters", &self.splitters.len())
            .finish()
    }
}

impl Splitter for SplitterChain {
    fn category(&self, chart: &Chart, resource: &Resource) -> Result<CategoryResult> {
        for splitter in &self.splitters {
            let result = splitter.category(chart, resource)?;
            if result != CategoryResult::Skip {
                return Ok(result);
            }
        }
        Ok(CategoryResult::Skip)
    }

    fn category_list(&self) -> Option<Vec<String>> {
        let mut union: Option<Vec<String>> = None;
        for list in self.splitters.iter().filter_map(|s| s.category_list()) {
            let union = union.get_or_insert_with(Vec::new);
            for name in list {
                if !union.contains(&name) {
                    union.push(name);
                }
            }
        }
        union
    }
}

/// Closure-backed splitter
pub struct FnSplitter<F> {
    func: F,
    categories: Option<Vec<String>>,
}

impl<F> FnSplitter<F>
where
    F: Fn(&Chart, &Resource) -> Result<CategoryResult> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            categories: None,
        }
    }

    pub fn with_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl<F> Splitter for FnSplitter<F>
where
    F: Fn(&Chart, &Resource) -> Result<CategoryResult> + Send + Sync,
{
    fn category(&self, chart: &Chart, resource: &Resource) -> Result<CategoryResult> {
        (self.func)(chart, resource)
    }

    fn category_list(&self) -> Option<Vec<String>> {
        self.categories.clone()
    }
}

/// Matching rules shared by [`ListSplitter`] and [`ProcessorSplitter`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// A resource matching no category is an error
    pub require_all: bool,

    /// A resource must match exactly one category
    pub exactly_one_category: bool,

    /// Used when nothing matched and `require_all` is off
    pub default_categories: Option<Vec<String>>,
}

impl SplitOptions {
    fn resolve(&self, matched: Vec<String>, resource: &Resource) -> Result<CategoryResult> {
        let mut matched = matched;

        if matched.is_empty() {
            if self.require_all {
                return Err(CoreError::parameter(format!(
                    "resource {} matched no category",
                    resource::describe(resource)
                )));
            }
            if let Some(defaults) = &self.default_categories {
                matched = defaults.clone();
            }
        }

        if self.exactly_one_category && matched.len() != 1 {
            return Err(CoreError::parameter(format!(
                "resource {} must match exactly one category, matched {:?}",
                resource::describe(resource),
                matched
            )));
        }

        if matched.is_empty() {
            Ok(CategoryResult::None)
        } else {
            Ok(CategoryResult::Categories(matched))
        }
    }

    fn category_list<'a>(&self, names: impl Iterator<Item = &'a String>) -> Vec<String> {
        let mut list: Vec<String> = names.cloned().collect();
        for name in self.default_categories.iter().flatten() {
            if !list.contains(name) {
                list.push(name.clone());
            }
        }
        list
    }
}

/// Predicate over a resource in the context of its chart
pub type ChartPredicate = Arc<dyn Fn(&Chart, &Resource) -> Result<bool> + Send + Sync>;

/// Categories are the names whose predicate holds
#[derive(Default)]
pub struct ListSplitter {
    predicates: IndexMap<String, ChartPredicate>,
    options: SplitOptions,
}

impl ListSplitter {
    pub fn new(options: SplitOptions) -> Self {
        Self {
            predicates: IndexMap::new(),
            options,
        }
    }

    pub fn with_category<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Chart, &Resource) -> Result<bool> + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }
}

impl Splitter for ListSplitter {
    fn category(&self, chart: &Chart, resource: &Resource) -> Result<CategoryResult> {
        let mut matched = Vec::new();
        for (name, predicate) in &self.predicates {
            if predicate(chart, resource)? {
                matched.push(name.clone());
            }
        }
        self.options.resolve(matched, resource)
    }

    fn category_list(&self) -> Option<Vec<String>> {
        Some(self.options.category_list(self.predicates.keys()))
    }
}

/// Categories are the names whose processor `filter` accepts the resource
#[derive(Default)]
pub struct ProcessorSplitter {
    processors: IndexMap<String, Box<dyn Processor>>,
    options: SplitOptions,
}

impl ProcessorSplitter {
    pub fn new(options: SplitOptions) -> Self {
        Self {
            processors: IndexMap::new(),
            options,
        }
    }

    pub fn with_category(
        mut self,
        name: impl Into<String>,
        processor: impl Processor + 'static,
    ) -> Self {
        self.processors.insert(name.into(), Box::new(processor));
        self
    }
}

impl Splitter for ProcessorSplitter {
    fn category(&self, chart: &Chart, resource: &Resource) -> Result<CategoryResult> {
        let mut matched = Vec::new();
        for (name, processor) in &self.processors {
            if processor.filter(chart, resource)? {
                matched.push(name.clone());
            }
        }
        self.options.resolve(matched, resource)
    }

    fn category_list(&self) -> Option<Vec<String>> {
        Some(self.options.category_list(self.processors.keys()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn deployment(name: &str) -> Resource {
        json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": name}})
    }

    fn service(name: &str) -> Resource {
        json!({"apiVersion": "v1", "kind": "Service", "metadata": {"name": name}})
    }

    fn by_kind(kind: &'static str) -> impl Fn(&Chart, &Resource) -> Result<bool> {
        move |_, r| Ok(resource::kind(r) == kind)
    }

    #[test]
    fn test_chain_first_non_skip_wins() {
        let chain = SplitterChain::new()
            .with(FnSplitter::new(|_, r| {
                Ok(if resource::kind(r) == "Service" {
                    CategoryResult::categories(["net"])
                } else {
                    CategoryResult::Skip
                })
            }))
            .with(FnSplitter::new(|_, _| Ok(CategoryResult::categories(["rest"]))));
        let chart = Chart::default();

        assert_eq!(
            chain.category(&chart, &service("s")).unwrap(),
            CategoryResult::categories(["net"])
        );
        assert_eq!(
            chain.category(&chart, &deployment("d")).unwrap(),
            CategoryResult::categories(["rest"])
        );
    }

    #[test]
    fn test_chain_all_skip() {
        let chain = SplitterChain::new().with(FnSplitter::new(|_, _| Ok(CategoryResult::Skip)));
        assert_eq!(
            chain.category(&Chart::default(), &service("s")).unwrap(),
            CategoryResult::Skip
        );
    }

    #[test]
    fn test_chain_category_list_union() {
        let chain = SplitterChain::new()
            .with(FnSplitter::new(|_, _| Ok(CategoryResult::Skip)).with_categories(["a", "b"]))
            .with(FnSplitter::new(|_, _| Ok(CategoryResult::Skip)))
            .with(FnSplitter::new(|_, _| Ok(CategoryResult::Skip)).with_categories(["b", "c"]));

        assert_eq!(
            chain.category_list(),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_list_splitter_multiple_matches() {
        let splitter = ListSplitter::new(SplitOptions::default())
            .with_category("workloads", by_kind("Deployment"))
            .with_category("named-web", |_, r| Ok(resource::name(r) == Some("web")));

        assert_eq!(
            splitter
                .category(&Chart::default(), &deployment("web"))
                .unwrap(),
            CategoryResult::categories(["workloads", "named-web"])
        );
        assert_eq!(
            splitter
                .category(&Chart::default(), &service("db"))
                .unwrap(),
            CategoryResult::None
        );
    }

    #[test]
    fn test_require_all() {
        let splitter = ListSplitter::new(SplitOptions {
            require_all: true,
            ..Default::default()
        })
        .with_category("workloads", by_kind("Deployment"));

        let err = splitter
            .category(&Chart::default(), &service("db"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_default_categories() {
        let splitter = ListSplitter::new(SplitOptions {
            default_categories: Some(vec!["misc".to_string()]),
            ..Default::default()
        })
        .with_category("workloads", by_kind("Deployment"));

        assert_eq!(
            splitter
                .category(&Chart::default(), &service("db"))
                .unwrap(),
            CategoryResult::categories(["misc"])
        );
        assert_eq!(
            splitter.category_list(),
            Some(vec!["workloads".to_string(), "misc".to_string()])
        );
    }

    #[test]
    fn test_exactly_one_rejects_overlap() {
        let splitter = ListSplitter::new(SplitOptions {
            exactly_one_category: true,
            ..Default::default()
        })
        .with_category("a", |_, _| Ok(true))
        .with_category("b", |_, _| Ok(true));

        let err = splitter
            .category(&Chart::default(), &service("db"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter);
    }

    #[test]
    fn test_split_options_from_yaml() {
        let options: SplitOptions =
            serde_yaml::from_str("exactly_one_category: true\ndefault_categories: [rest]\n")
                .unwrap();
        assert!(options.exactly_one_category);
        assert!(!options.require_all);
        assert_eq!(options.default_categories, Some(vec!["rest".to_string()]));
    }
}
