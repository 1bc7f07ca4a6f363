//! Processor contract and composition
//!
//! A processor turns one chart into a new chart. [`Chart::process`] drives
//! the hooks for every resource:
//!
//! 1. `mutate_before` canonicalises the cloned resource
//! 2. `filter` decides whether it is kept
//! 3. `mutate` rewrites kept resources
//!
//! Once every resource went through, `mutate_complete` may replace the whole
//! resource list.

use std::sync::Arc;

use crate::chart::Chart;
use crate::error::Result;
use crate::resource::Resource;

/// Four-hook resource transformation
///
/// Every hook has a pass-through default so implementations only override
/// what they need. `filter` must not modify the resource; the mutate hooks
/// only ever see the already-cloned output resource.
pub trait Processor: Send + Sync {
    /// Decide whether the resource is kept
    fn filter(&self, _chart: &Chart, _resource: &Resource) -> Result<bool> {
        Ok(true)
    }

    /// Runs before [`Processor::filter`]
    fn mutate_before(&self, _chart: &Chart, _resource: &mut Resource) -> Result<()> {
        Ok(())
    }

    /// Runs on kept resources only
    fn mutate(&self, _chart: &Chart, _resource: &mut Resource) -> Result<()> {
        Ok(())
    }

    /// Whole-chart rewrite; `None` keeps the list as is
    fn mutate_complete(
        &self,
        _chart: &Chart,
        _resources: &[Resource],
    ) -> Result<Option<Vec<Resource>>> {
        Ok(None)
    }
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn filter(&self, chart: &Chart, resource: &Resource) -> Result<bool> {
        (**self).filter(chart, resource)
    }

    fn mutate_before(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        (**self).mutate_before(chart, resource)
    }

    fn mutate(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        (**self).mutate(chart, resource)
    }

    fn mutate_complete(
        &self,
        chart: &Chart,
        resources: &[Resource],
    ) -> Result<Option<Vec<Resource>>> {
        (**self).mutate_complete(chart, resources)
    }
}

impl<P: Processor + ?Sized> Processor for Arc<P> {
    fn filter(&self, chart: &Chart, resource: &Resource) -> Result<bool> {
        (**self).filter(chart, resource)
    }

    fn mutate_before(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        (**self).mutate_before(chart, resource)
    }

    fn mutate(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        (**self).mutate(chart, resource)
    }

    fn mutate_complete(
        &self,
        chart: &Chart,
        resources: &[Resource],
    ) -> Result<Option<Vec<Resource>>> {
        (**self).mutate_complete(chart, resources)
    }
}

/// Processor that keeps everything untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProcessor;

impl Processor for IdentityProcessor {}

/// Runs member processors in registration order
///
/// `filter` is the AND of all members and stops at the first rejection.
/// `mutate_complete` is threaded: each member sees the previous member's
/// output.
#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, processor: impl Processor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn push(&mut self, processor: Box<dyn Processor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl FromIterator<Box<dyn Processor>> for ProcessorChain {
    fn from_iter<I: IntoIterator<Item = Box<dyn Processor>>>(iter: I) -> Self {
        Self {
            processors: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("processors", &self.processors.len())
            .finish()
    }
}

impl Processor for ProcessorChain {
    fn filter(&self, chart: &Chart, resource: &Resource) -> Result<bool> {
        for processor in &self.processors {
            if !processor.filter(chart, resource)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn mutate_before(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        for processor in &self.processors {
            processor.mutate_before(chart, resource)?;
        }
        Ok(())
    }

    fn mutate(&self, chart: &Chart, resource: &mut Resource) -> Result<()> {
        for processor in &self.processors {
            processor.mutate(chart, resource)?;
        }
        Ok(())
    }

    fn mutate_complete(
        &self,
        chart: &Chart,
        resources: &[Resource],
    ) -> Result<Option<Vec<Resource>>> {
        let mut current: Option<Vec<Resource>> = None;
        for processor in &self.processors {
            let input = current.as_deref().unwrap_or(resources);
            if let Some(output) = processor.mutate_complete(chart, input)? {
                current = Some(output);
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource;
    use serde_json::json;

    struct AddLabel(&'static str);

    impl Processor for AddLabel {
        fn mutate(&self, _chart: &Chart, resource: &mut Resource) -> Result<()> {
            resource["metadata"]["labels"][self.0] = json!("yes");
            Ok(())
        }
    }

    struct OnlyKind(&'static str);

    impl Processor for OnlyKind {
        fn filter(&self, _chart: &Chart, resource: &Resource) -> Result<bool> {
            Ok(resource::kind(resource) == self.0)
        }
    }

    struct Reverse;

    impl Processor for Reverse {
        fn mutate_complete(
            &self,
            _chart: &Chart,
            resources: &[Resource],
        ) -> Result<Option<Vec<Resource>>> {
            Ok(Some(resources.iter().rev().cloned().collect()))
        }
    }

    struct DropFirst;

    impl Processor for DropFirst {
        fn mutate_complete(
            &self,
            _chart: &Chart,
            resources: &[Resource],
        ) -> Result<Option<Vec<Resource>>> {
            Ok(Some(resources.iter().skip(1).cloned().collect()))
        }
    }

    fn sample() -> Chart {
        Chart::default().with_resources(vec![
            json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "a"}}),
            json!({"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "b"}}),
            json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "c"}}),
        ])
    }

    #[test]
    fn test_chain_filter_is_and() {
        let chain = ProcessorChain::new()
            .with(OnlyKind("ConfigMap"))
            .with(AddLabel("seen"));
        let out = sample().process(&chain).unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r["metadata"]["labels"]["seen"] == "yes"));
    }

    #[test]
    fn test_chain_with_identity_matches_single() {
        let chart = sample();
        let single = chart.process(&AddLabel("x")).unwrap();
        let chained = chart
            .process(&ProcessorChain::new().with(AddLabel("x")).with(IdentityProcessor))
            .unwrap();

        assert_eq!(single.resources(), chained.resources());
    }

    #[test]
    fn test_mutate_complete_is_threaded() {
        // Reverse then drop the first: the last input resource disappears
        let chain = ProcessorChain::new().with(Reverse).with(DropFirst);
        let out = sample().process(&chain).unwrap();

        let names: Vec<_> = out.iter().filter_map(resource::name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chart = sample();
        let out = chart.process(&ProcessorChain::new()).unwrap();
        assert_eq!(out.resources(), chart.resources());
    }
}
