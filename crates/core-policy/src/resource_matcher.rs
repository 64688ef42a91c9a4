//! # Rule Matcher
//!
//! Evaluates a single rule of a `for.<type>` list against a resource and an
//! action. Evaluation has two steps:
//!
//! 1. **Conditions**: every declared `match`, `equals` and `contains`
//!    section must pass. A rule declaring none of them matches every
//!    resource of its type.
//! 2. **Actions**: for a matching rule, `deny` is consulted first and wins
//!    outright; `allow` is consulted only when nothing was denied.
//!
//! Conditions of an unexpected shape make the rule not match. They never
//! abort evaluation of the surrounding rule list.
//!
//! ```
//! use core_policy::document::PolicyDocument;
//! use core_policy::document::TypeSection;
//! use core_policy::{PatternCache, Resource, RuleMatcher};
//!
//! let doc: PolicyDocument = serde_yaml::from_str(
//!     "for:\n  node:\n    - match: {name: web.*}\n      allow: [read]\n",
//! ).unwrap();
//! let Some(TypeSection::Rules(rules)) = doc.type_section("node") else { unreachable!() };
//!
//! let matcher = RuleMatcher::build(&rules[0], &PatternCache::new()).unwrap();
//! let outcome = matcher.includes(&Resource::of_type("node").with("name", "web01"), "read");
//! assert!(outcome.matched);
//! assert!(outcome.decision.granted());
//! ```

use crate::decision::{ContextDecision, ContextEvaluation, ExplanationCode};
use crate::document::{ActionList, ConditionSection, ConditionValue, RuleDefinition, RuleShape};
use crate::error::Result;
use crate::pattern::PatternCache;
use crate::predicate::Predicate;
use crate::resource::Resource;
use core::fmt;
use std::collections::BTreeSet;

const WILDCARD_ACTION: &str = "*";

/// Result of evaluating one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Whether the rule's conditions matched the resource
    pub matched: bool,
    /// Rule-level decision and evaluation trail
    pub decision: ContextDecision,
}

/// Which condition section a set of tests came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Match,
    Equals,
    Contains,
}

impl SectionKind {
    const fn name(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Equals => "equals",
            Self::Contains => "contains",
        }
    }
}

/// A compiled condition section.
///
/// `None` tests stand for a section or entry of an unexpected shape.
#[derive(Debug, Clone)]
struct Condition {
    kind: SectionKind,
    tests: Option<Vec<(String, Option<Vec<Predicate>>)>>,
}

impl Condition {
    fn build(kind: SectionKind, section: &ConditionSection, cache: &PatternCache) -> Result<Self> {
        let tests = match section {
            ConditionSection::Malformed => None,
            ConditionSection::Entries(entries) => Some(
                entries
                    .iter()
                    .map(|(key, value)| -> Result<_> {
                        Ok((key.clone(), compile_value(kind, value, cache)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(Self { kind, tests })
    }

    /// All entries pass, each entry requiring all of its predicates
    fn matches(&self, resource: &Resource) -> bool {
        let Some(tests) = &self.tests else {
            return false;
        };
        tests.iter().all(|(key, predicates)| {
            predicates.as_ref().is_some_and(|predicates| {
                let value = resource.get(key);
                predicates.iter().all(|p| p.evaluate(value))
            })
        })
    }
}

fn compile_value(
    kind: SectionKind,
    value: &ConditionValue,
    cache: &PatternCache,
) -> Result<Option<Vec<Predicate>>> {
    let items: &[String] = match (kind, value) {
        (_, ConditionValue::Malformed) => return Ok(None),
        // equals compares against exactly one string
        (SectionKind::Equals, ConditionValue::List(_)) => return Ok(None),
        (_, ConditionValue::Single(item)) => core::slice::from_ref(item),
        (_, ConditionValue::List(items)) => items,
    };
    items
        .iter()
        .map(|item| -> Result<Predicate> {
            Ok(match kind {
                SectionKind::Match => Predicate::Regex(cache.get_or_compile(item)?),
                SectionKind::Equals => Predicate::Equals(item.clone()),
                SectionKind::Contains => Predicate::contains_item(item.clone()),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[derive(Debug, Clone)]
enum MatcherBody {
    Rule {
        conditions: Vec<Condition>,
        allow: Option<ActionList>,
        deny: Option<ActionList>,
    },
    Malformed(&'static str),
}

/// Compiled form of one rule definition
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    index: usize,
    summary: String,
    body: MatcherBody,
}

impl RuleMatcher {
    /// Compile a rule definition, resolving its regexes through `cache`
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if a `match` regex does not compile
    pub fn build(rule: &RuleDefinition, cache: &PatternCache) -> Result<Self> {
        let body = match &rule.shape {
            RuleShape::Malformed(found) => MatcherBody::Malformed(*found),
            RuleShape::Sections(sections) => {
                let declared = [
                    (SectionKind::Match, &sections.match_section),
                    (SectionKind::Equals, &sections.equals_section),
                    (SectionKind::Contains, &sections.contains_section),
                ];
                let conditions = declared
                    .into_iter()
                    .filter_map(|(kind, section)| {
                        section.as_ref().map(|s| Condition::build(kind, s, cache))
                    })
                    .collect::<Result<Vec<_>>>()?;
                MatcherBody::Rule {
                    conditions,
                    allow: sections.allow.clone(),
                    deny: sections.deny.clone(),
                }
            }
        };
        Ok(Self {
            index: rule.index,
            summary: rule.summary.clone(),
            body,
        })
    }

    /// 1-based position of the rule in its type section
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Evaluate the rule against a resource and action
    #[must_use]
    pub fn includes(&self, resource: &Resource, action: &str) -> RuleOutcome {
        let mut evaluations = Vec::new();

        let (conditions, allow, deny) = match &self.body {
            MatcherBody::Malformed(found) => {
                evaluations.push(ContextEvaluation::new(
                    ExplanationCode::RejectedContextEvaluationError,
                    format!("{self} is not a map (found {found})"),
                ));
                return RuleOutcome {
                    matched: false,
                    decision: ContextDecision::new(ExplanationCode::Rejected, false, evaluations),
                };
            }
            MatcherBody::Rule {
                conditions,
                allow,
                deny,
            } => (conditions, allow, deny),
        };

        let mut met = 0;
        for condition in conditions {
            if condition.matches(resource) {
                met += 1;
            } else {
                evaluations.push(ContextEvaluation::new(
                    ExplanationCode::Rejected,
                    format!("{self} {} section did not match", condition.kind.name()),
                ));
            }
        }
        if met != conditions.len() {
            return RuleOutcome {
                matched: false,
                decision: ContextDecision::new(ExplanationCode::Rejected, false, evaluations),
            };
        }

        RuleOutcome {
            matched: true,
            decision: self.evaluate_actions(action, allow.as_ref(), deny.as_ref(), evaluations),
        }
    }

    fn evaluate_actions(
        &self,
        action: &str,
        allow: Option<&ActionList>,
        deny: Option<&ActionList>,
        mut evaluations: Vec<ContextEvaluation>,
    ) -> ContextDecision {
        if let Some(denied) = self.authorized(deny, action, "deny", &mut evaluations) {
            evaluations.push(ContextEvaluation::new(
                ExplanationCode::RejectedDenied,
                format!("{self} for actions: {}", format_actions(denied)),
            ));
            return ContextDecision::new(ExplanationCode::RejectedDenied, false, evaluations);
        }

        if let Some(allowed) = self.authorized(allow, action, "allow", &mut evaluations) {
            evaluations.push(ContextEvaluation::new(
                ExplanationCode::GrantedActionsAndCommandsMatched,
                format!("{self} for actions: {}", format_actions(allowed)),
            ));
            return ContextDecision::new(
                ExplanationCode::GrantedActionsAndCommandsMatched,
                true,
                evaluations,
            );
        }

        evaluations.push(ContextEvaluation::new(
            ExplanationCode::Rejected,
            format!("{self} does not allow action '{action}'"),
        ));
        ContextDecision::new(ExplanationCode::Rejected, false, evaluations)
    }

    /// The action set, if it names `action` or the wildcard
    fn authorized<'a>(
        &self,
        list: Option<&'a ActionList>,
        action: &str,
        section: &str,
        evaluations: &mut Vec<ContextEvaluation>,
    ) -> Option<&'a BTreeSet<String>> {
        match list? {
            ActionList::Invalid => {
                evaluations.push(ContextEvaluation::new(
                    ExplanationCode::RejectedContextEvaluationError,
                    format!("{self} has an invalid {section} action type"),
                ));
                None
            }
            ActionList::Actions(actions) => (actions.contains(WILDCARD_ACTION)
                || actions.contains(action))
            .then_some(actions),
        }
    }
}

impl fmt::Display for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[rule: {}: {}]", self.index, self.summary)
    }
}

fn format_actions(actions: &BTreeSet<String>) -> String {
    let actions: Vec<&str> = actions.iter().map(String::as_str).collect();
    format!("[{}]", actions.join(", "))
}
