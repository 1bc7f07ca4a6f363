//! Engine behaviour switches carried by every chart

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chart configuration
///
/// ```yaml
/// parse_list_resource: true
/// http_timeout: 45s
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfiguration {
    /// Descend into `List` resources and process each item
    pub parse_list_resource: bool,

    /// Upper bound for each repository HTTP request (default: 30s)
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,
}

impl Default for ChartConfiguration {
    fn default() -> Self {
        Self {
            parse_list_resource: false,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl ChartConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse_list_resource(mut self, enabled: bool) -> Self {
        self.parse_list_resource = enabled;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
