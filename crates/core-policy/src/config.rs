//! Policy options and well-known names
//!
//! Section and attribute names are fixed by the policy file format. The
//! environment namespace and the pattern cache can be supplied through
//! [`PolicyOptions`].

use crate::pattern::PatternCache;
use serde::Deserialize;
use std::sync::Arc;

/// Resource attribute naming the resource type
pub const TYPE_PROPERTY: &str = "type";

/// Resource type that may fall back to the legacy `rules` section
pub const JOB_TYPE: &str = "job";

/// Top-level map from resource type to rule lists
pub const FOR_SECTION: &str = "for";

/// Top-level legacy map from resource path regex to rule body
pub const RULES_SECTION: &str = "rules";

/// Action field of a legacy rule body
pub const ACTIONS_SECTION: &str = "actions";

/// Top-level environmental context section
pub const CONTEXT_SECTION: &str = "context";

/// Namespace under which environmental context properties become URIs
pub const ENV_URI_BASE: &str = "http://dtolabs.com/rundeck/env/";

/// Options applied when building a [`Policy`](crate::Policy)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    /// Base URI prepended to environmental context property names
    pub environment_namespace: String,

    /// Pattern cache to compile into; the process-wide cache when `None`
    #[serde(skip)]
    pub pattern_cache: Option<Arc<PatternCache>>,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            environment_namespace: ENV_URI_BASE.to_string(),
            pattern_cache: None,
        }
    }
}

impl PolicyOptions {
    /// Use a dedicated pattern cache instead of the process-wide one
    #[must_use]
    pub fn with_pattern_cache(mut self, cache: Arc<PatternCache>) -> Self {
        self.pattern_cache = Some(cache);
        self
    }

    /// Resolve the pattern cache these options point at
    #[must_use]
    pub fn cache(&self) -> Arc<PatternCache> {
        self.pattern_cache
            .clone()
            .unwrap_or_else(PatternCache::shared)
    }
}
