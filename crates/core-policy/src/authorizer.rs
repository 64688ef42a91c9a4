//! Type context evaluation
//!
//! A [`TypeContext`] holds the ordered rules declared for one resource type
//! and combines their outcomes with deny-overrides-allow semantics:
//!
//! - any matching rule that denies the action → `REJECTED_DENIED`
//! - otherwise any matching rule that allows it → `GRANTED`
//! - otherwise → `REJECTED`
//!
//! Every rule is evaluated; declaration order only decides the order of the
//! evaluation trail, never the outcome.

use crate::decision::{ContextDecision, ContextEvaluation, ExplanationCode};
use crate::document::RuleDefinition;
use crate::error::Result;
use crate::pattern::PatternCache;
use crate::resource::Resource;
use crate::resource_matcher::RuleMatcher;

/// Anything that can decide a resource and action (DIP - Dependency Inversion)
///
/// Implemented by [`Policy`](crate::Policy), by the per-policy
/// [`ContextRouter`](crate::ContextRouter), and by the two rule dialects.
pub trait AclContext {
    /// Decide whether `action` on `resource` is granted
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if a pattern needed for the
    /// decision does not compile
    fn includes(&self, resource: &Resource, action: &str) -> Result<ContextDecision>;
}

/// Rules governing one resource type
///
/// ## Example
///
/// ```
/// use core_policy::document::{PolicyDocument, TypeSection};
/// use core_policy::{ExplanationCode, PatternCache, Resource, TypeContext};
///
/// let doc: PolicyDocument = serde_yaml::from_str(concat!(
///     "for:\n",
///     "  node:\n",
///     "    - allow: [exec]\n",
///     "    - match: {name: 'db.*'}\n",
///     "      deny: [exec]\n",
/// )).unwrap();
/// let Some(TypeSection::Rules(rules)) = doc.type_section("node") else { unreachable!() };
/// let context = TypeContext::build(rules, &PatternCache::new()).unwrap();
///
/// let web = Resource::of_type("node").with("name", "web01");
/// let db = Resource::of_type("node").with("name", "db01");
/// assert_eq!(context.evaluate(&web, "exec").code(), ExplanationCode::Granted);
/// assert_eq!(context.evaluate(&db, "exec").code(), ExplanationCode::RejectedDenied);
/// ```
#[derive(Debug, Clone)]
pub struct TypeContext {
    rules: Vec<RuleMatcher>,
}

impl TypeContext {
    /// Create a context from already compiled rules
    #[must_use]
    pub const fn new(rules: Vec<RuleMatcher>) -> Self {
        Self { rules }
    }

    /// Compile a type section's rule list
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if any rule's regex does not compile
    pub fn build(rules: &[RuleDefinition], cache: &PatternCache) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| RuleMatcher::build(rule, cache))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Evaluate every rule and aggregate with deny-overrides-allow
    #[must_use]
    pub fn evaluate(&self, resource: &Resource, action: &str) -> ContextDecision {
        let mut evaluations = Vec::new();
        let mut allowed = false;
        let mut denied = false;

        for rule in &self.rules {
            let outcome = rule.includes(resource, action);
            if outcome.matched {
                allowed |= outcome.decision.granted();
                denied |= outcome.decision.code() == ExplanationCode::RejectedDenied;
            }
            evaluations.extend(outcome.decision.into_evaluations());
        }

        if denied {
            ContextDecision::new(ExplanationCode::RejectedDenied, false, evaluations)
        } else if allowed {
            ContextDecision::new(ExplanationCode::Granted, true, evaluations)
        } else {
            if evaluations.is_empty() {
                evaluations.push(ContextEvaluation::new(
                    ExplanationCode::Rejected,
                    "No rules declared for this type",
                ));
            }
            ContextDecision::new(ExplanationCode::Rejected, false, evaluations)
        }
    }

    /// Get the number of rules being evaluated
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl AclContext for TypeContext {
    fn includes(&self, resource: &Resource, action: &str) -> Result<ContextDecision> {
        Ok(self.evaluate(resource, action))
    }
}
