//! Context routing
//!
//! The [`ContextRouter`] validates document-level preconditions, then picks
//! the rule set for the resource's `type`:
//!
//! 1. `for.<type>` when declared, compiled into a [`TypeContext`]
//! 2. otherwise, for `job` resources only, the legacy `rules` section,
//!    compiled into a [`LegacyRulesContext`]
//! 3. otherwise the request is rejected with `REJECTED_NO_RULES_DECLARED`
//!
//! Compiled contexts are built on first use and kept for the lifetime of the
//! router. Concurrent first uses may build twice; the first stored context
//! wins and every caller evaluates against it.

use crate::authorizer::{AclContext, TypeContext};
use crate::config::{FOR_SECTION, JOB_TYPE, TYPE_PROPERTY};
use crate::decision::{ContextDecision, ExplanationCode};
use crate::document::{ForSection, PolicyDocument, TypeSection};
use crate::error::Result;
use crate::legacy::LegacyRulesContext;
use crate::pattern::PatternCache;
use crate::resource::Resource;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Compiled rule set for one resource type
#[derive(Debug, Clone)]
pub enum ScopedContext {
    /// Rules from `for.<type>`
    Typed(TypeContext),
    /// Legacy `rules` section for `job` resources
    Legacy(LegacyRulesContext),
}

impl ScopedContext {
    /// Evaluate the resource and action with this rule set
    #[must_use]
    pub fn evaluate(&self, resource: &Resource, action: &str) -> ContextDecision {
        match self {
            Self::Typed(context) => context.evaluate(resource, action),
            Self::Legacy(context) => context.evaluate(resource, action),
        }
    }

    /// Name of the rule dialect
    #[must_use]
    pub const fn dialect(&self) -> &'static str {
        match self {
            Self::Typed(_) => "typed",
            Self::Legacy(_) => "legacy",
        }
    }

    fn rule_count(&self) -> usize {
        match self {
            Self::Typed(context) => context.rule_count(),
            Self::Legacy(context) => context.rule_count(),
        }
    }
}

/// Outcome of looking up the rule set for a type
enum Route {
    Context(Arc<ScopedContext>),
    Rejected(ContextDecision),
}

/// Routes requests to the rule set for their resource type
#[derive(Debug)]
pub struct ContextRouter {
    document: Arc<PolicyDocument>,
    cache: Arc<PatternCache>,
    contexts: DashMap<String, Arc<ScopedContext>>,
}

impl ContextRouter {
    /// Create a router over a document, compiling patterns into `cache`
    #[must_use]
    pub fn new(document: Arc<PolicyDocument>, cache: Arc<PatternCache>) -> Self {
        Self {
            document,
            cache,
            contexts: DashMap::new(),
        }
    }

    /// The document being routed
    #[must_use]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Context already built for `resource_type`, if any
    #[must_use]
    pub fn cached_context(&self, resource_type: &str) -> Option<Arc<ScopedContext>> {
        self.contexts
            .get(resource_type)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of resource types with a built context
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.contexts.len()
    }

    /// Decide a resource and action
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if building the type's rule set
    /// hits a regex that does not compile
    pub fn evaluate(&self, resource: &Resource, action: &str) -> Result<ContextDecision> {
        if self.document.description().is_none() {
            return Ok(ContextDecision::rejected(
                ExplanationCode::RejectedNoDescriptionProvided,
                "Policy is missing a description.",
            ));
        }

        let Some(resource_type) = resource.resource_type() else {
            return Ok(ContextDecision::rejected(
                ExplanationCode::RejectedNoResourceType,
                format!("Resource has no '{TYPE_PROPERTY}'."),
            ));
        };

        if matches!(self.document.for_section(), ForSection::Invalid) {
            return Ok(ContextDecision::rejected(
                ExplanationCode::RejectedInvalidForSection,
                format!("'{FOR_SECTION}' section is not a map"),
            ));
        }

        let context = match self.cached_context(resource_type) {
            Some(context) => context,
            None => match self.build_context(resource_type)? {
                Route::Context(context) => context,
                Route::Rejected(rejection) => return Ok(rejection),
            },
        };
        Ok(context.evaluate(resource, action))
    }

    /// Build and store the context for `resource_type`, or explain why none exists
    fn build_context(
        &self,
        resource_type: &str,
    ) -> Result<Route> {
        let built = match self.document.type_section(resource_type) {
            Some(TypeSection::Rules(rules)) => {
                ScopedContext::Typed(TypeContext::build(rules, &self.cache)?)
            }
            Some(TypeSection::Invalid) => {
                return Ok(Route::Rejected(ContextDecision::rejected(
                    ExplanationCode::RejectedInvalidForSection,
                    format!("Section for type '{resource_type}' in '{FOR_SECTION}' is not a list"),
                )));
            }
            None => match self.document.legacy_rules() {
                Some(rules) if resource_type == JOB_TYPE => {
                    ScopedContext::Legacy(LegacyRulesContext::build(rules, &self.cache)?)
                }
                _ => {
                    return Ok(Route::Rejected(ContextDecision::rejected(
                        ExplanationCode::RejectedNoRulesDeclared,
                        format!(
                            "Section for type '{resource_type}' was not declared in {FOR_SECTION} section"
                        ),
                    )));
                }
            },
        };

        let context = match self.contexts.entry(resource_type.to_string()) {
            Entry::Occupied(existing) => {
                tracing::debug!(
                    resource_type,
                    "type context built concurrently, keeping the stored one"
                );
                Arc::clone(existing.get())
            }
            Entry::Vacant(slot) => {
                tracing::debug!(
                    resource_type,
                    dialect = built.dialect(),
                    rules = built.rule_count(),
                    "built type context"
                );
                Arc::clone(slot.insert(Arc::new(built)).value())
            }
        };
        Ok(Route::Context(context))
    }
}

impl AclContext for ContextRouter {
    fn includes(&self, resource: &Resource, action: &str) -> Result<ContextDecision> {
        self.evaluate(resource, action)
    }
}
