use crate::chart::Chart;
use crate::error::Result;
use crate::processor::Processor;
use crate::resource::{self, Resource};

/// Keeps only `CustomResourceDefinition` resources, or drops them when inverted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCRDs {
    pub invert_filter: bool,
}

impl FilterCRDs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inverted() -> Self {
        Self {
            invert_filter: true,
        }
    }
}

impl Processor for FilterCRDs {
    fn filter(&self, _chart: &Chart, resource: &Resource) -> Result<bool> {
        Ok(resource::is_crd(resource) != self.invert_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::{ProcessorSplitter, SplitOptions};
    use serde_json::json;

    fn chart() -> Chart {
        Chart::default().with_resources(vec![
            json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "a"}}),
            json!({
                "apiVersion": "apiextensions.k8s.io/v1",
                "kind": "CustomResourceDefinition",
                "metadata": {"name": "widgets.example.com"}
            }),
            json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "b"}}),
        ])
    }

    #[test]
    fn test_filter() {
        let crds = chart().process(&FilterCRDs::new()).unwrap();
        assert_eq!(crds.len(), 1);
        assert!(resource::is_crd(&crds.resources()[0]));

        let rest = chart().process(&FilterCRDs::inverted()).unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_crd_fan_out() {
        let chart = chart();
        let splitter = ProcessorSplitter::new(SplitOptions {
            exactly_one_category: true,
            ..Default::default()
        })
        .with_category("crds", FilterCRDs::new())
        .with_category("rest", FilterCRDs::inverted());

        let parts = chart.split(&splitter).unwrap();

        assert_eq!(parts["crds"].len(), 1);
        assert_eq!(resource::kind(&parts["crds"].resources()[0]), "CustomResourceDefinition");
        assert_eq!(parts["rest"].len(), 2);
        assert!(parts["rest"].iter().all(|r| resource::kind(r) == "Deployment"));

        // Every resource lands in exactly one output chart
        for source in chart.iter() {
            let hits = parts
                .values()
                .filter(|part| part.iter().any(|r| r == source))
                .count();
            assert_eq!(hits, 1);
        }
    }
}
