//! Legacy `rules` dialect
//!
//! Older policies for `job` resources declare a top-level `rules` map from a
//! regex over the job path `<group>/<job>` to an `actions` field:
//!
//! ```yaml
//! rules:
//!   ops/.*:
//!     actions: read,run
//!   ops/deploy:
//!     actions: [read]
//! ```
//!
//! Rules are scanned in document order and the first rule that authorizes
//! the action grants it. The dialect has no deny.
//!
//! A string `actions` value grants when it *contains* the requested action
//! as a substring (`"read,run"` grants `"run"`, and also `"ru"`), or when it
//! is exactly `*`. A list grants only exact members. Existing policy files
//! rely on both behaviors.
//!
//! Every rule key is compiled when the context is built, so one invalid key
//! fails every `job` request, even when an earlier rule would have granted
//! before the scan reached it.

use crate::authorizer::AclContext;
use crate::decision::{ContextDecision, ContextEvaluation, ExplanationCode};
use crate::document::{LegacyActions, LegacyRuleDefinition, LegacyRuleKey};
use crate::error::Result;
use crate::pattern::PatternCache;
use crate::resource::Resource;
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum CompiledKey {
    Pattern { source: String, regex: Arc<Regex> },
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
struct LegacyRule {
    key: CompiledKey,
    actions: LegacyActions,
}

/// Decides `job` resources from the legacy `rules` section
#[derive(Debug, Clone)]
pub struct LegacyRulesContext {
    rules: Vec<LegacyRule>,
}

/// Build the legacy job path `<group>/<job>`.
///
/// Missing attributes are rendered as the literal text `null`.
#[must_use]
pub fn legacy_resource_path(resource: &Resource) -> String {
    let part = |key: &str| {
        resource
            .get(key)
            .map_or_else(|| "null".to_string(), ToString::to_string)
    };
    format!("{}/{}", part("group"), part("job"))
}

impl LegacyRulesContext {
    /// Compile the legacy rule list
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if a rule key is not a valid regex
    pub fn build(rules: &[LegacyRuleDefinition], cache: &PatternCache) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| -> Result<LegacyRule> {
                let key = match &rule.key {
                    LegacyRuleKey::Invalid(kind) => CompiledKey::Invalid(*kind),
                    LegacyRuleKey::Pattern(source) => CompiledKey::Pattern {
                        source: source.clone(),
                        regex: cache.get_or_compile(source)?,
                    },
                };
                Ok(LegacyRule {
                    key,
                    actions: rule.actions.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Scan the rules for the first one authorizing `action` on the job path
    #[must_use]
    pub fn evaluate(&self, resource: &Resource, action: &str) -> ContextDecision {
        let path = legacy_resource_path(resource);
        let mut evaluations = Vec::new();

        for rule in &self.rules {
            let (source, regex) = match &rule.key {
                CompiledKey::Invalid(kind) => {
                    evaluations.push(ContextEvaluation::new(
                        ExplanationCode::RejectedContextEvaluationError,
                        format!("Invalid key type: {kind}"),
                    ));
                    continue;
                }
                CompiledKey::Pattern { source, regex } => (source, regex),
            };

            if source.is_empty() {
                evaluations.push(ContextEvaluation::new(
                    ExplanationCode::RejectedContextEvaluationError,
                    "Resource is empty or null",
                ));
            }

            if !regex.is_match(&path) {
                continue;
            }

            let granted = match &rule.actions {
                LegacyActions::Absent => {
                    evaluations.push(ContextEvaluation::new(
                        ExplanationCode::RejectedActionsDeclaredEmpty,
                        format!("Legacy rule: {source} has no actions configured"),
                    ));
                    continue;
                }
                LegacyActions::Text(actions) => (actions == "*" || actions.contains(action))
                    .then(|| actions.clone()),
                LegacyActions::List(actions) => actions
                    .iter()
                    .any(|a| a == action)
                    .then(|| format!("[{}]", actions.join(", "))),
                LegacyActions::Invalid => {
                    evaluations.push(ContextEvaluation::new(
                        ExplanationCode::RejectedContextEvaluationError,
                        format!("Legacy rule: {source} has an invalid action type"),
                    ));
                    None
                }
            };

            if let Some(actions) = granted {
                evaluations.push(ContextEvaluation::new(
                    ExplanationCode::GrantedActionsAndCommandsMatched,
                    format!("Legacy rule: {source} action: {actions}"),
                ));
                return ContextDecision::new(
                    ExplanationCode::GrantedActionsAndCommandsMatched,
                    true,
                    evaluations,
                );
            }

            evaluations.push(ContextEvaluation::new(
                ExplanationCode::RejectedNoActionsMatched,
                format!("Legacy rule: {source} matched {path} but no actions matched '{action}'"),
            ));
        }

        if evaluations.is_empty() {
            evaluations.push(ContextEvaluation::new(
                ExplanationCode::Rejected,
                format!("No legacy rule matched resource path '{path}'"),
            ));
        }
        ContextDecision::new(ExplanationCode::Rejected, false, evaluations)
    }

    /// Get the number of legacy rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl AclContext for LegacyRulesContext {
    fn includes(&self, resource: &Resource, action: &str) -> Result<ContextDecision> {
        Ok(self.evaluate(resource, action))
    }
}
