//! Property-based tests for rule combination
//!
//! Invariants checked:
//!
//! 1. A deny anywhere in the rule list beats any number of allows
//! 2. The decision code does not depend on rule order
//! 3. Comma-separated text splits into trimmed, non-trailing items

use core_policy::document::TypeSection;
use core_policy::predicate::split_items;
use core_policy::{ExplanationCode, PatternCache, Resource, TypeContext};
use proptest::prelude::*;
use serde_yaml::Value;

const ACTIONS: [&str; 4] = ["read", "run", "kill", "delete"];

#[derive(Debug, Clone)]
struct GeneratedRule {
    deny: bool,
    action: &'static str,
}

fn generated_rule() -> impl Strategy<Value = GeneratedRule> {
    (any::<bool>(), prop::sample::select(ACTIONS.to_vec()))
        .prop_map(|(deny, action)| GeneratedRule { deny, action })
}

fn render(rules: &[GeneratedRule]) -> String {
    let mut yaml = String::from("description: generated\nfor:\n  node:\n");
    for rule in rules {
        let verb = if rule.deny { "deny" } else { "allow" };
        yaml.push_str(&format!("    - {verb}: {}\n", rule.action));
    }
    yaml
}

fn decide(rules: &[GeneratedRule], action: &str) -> ExplanationCode {
    let value: Value = serde_yaml::from_str(&render(rules)).unwrap();
    let policy = core_policy::Policy::from_value(&value).unwrap();
    policy
        .includes(&Resource::of_type("node"), action)
        .unwrap()
        .code()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The outcome is decided by which actions are allowed or denied, never by position
    #[test]
    fn prop_deny_overrides_allow(
        rules in prop::collection::vec(generated_rule(), 1..8),
        action in prop::sample::select(ACTIONS.to_vec()),
    ) {
        let denied = rules.iter().any(|r| r.deny && r.action == action);
        let allowed = rules.iter().any(|r| !r.deny && r.action == action);

        let expected = if denied {
            ExplanationCode::RejectedDenied
        } else if allowed {
            ExplanationCode::Granted
        } else {
            ExplanationCode::Rejected
        };
        prop_assert_eq!(decide(&rules, action), expected);
    }

    /// Reversing the rule list never changes the decision
    #[test]
    fn prop_order_independent(
        rules in prop::collection::vec(generated_rule(), 1..8),
        action in prop::sample::select(ACTIONS.to_vec()),
    ) {
        let mut reversed = rules.clone();
        reversed.reverse();
        prop_assert_eq!(decide(&rules, action), decide(&reversed, action));
    }

    /// Every matched rule leaves at least one evaluation in the trail
    #[test]
    fn prop_trail_covers_every_rule(
        rules in prop::collection::vec(generated_rule(), 1..8),
        action in prop::sample::select(ACTIONS.to_vec()),
    ) {
        let value: Value = serde_yaml::from_str(&render(&rules)).unwrap();
        let doc = core_policy::PolicyDocument::from_value(&value).unwrap();
        let Some(TypeSection::Rules(definitions)) = doc.type_section("node") else {
            panic!("generated section is a list");
        };
        let context = TypeContext::build(definitions, &PatternCache::new()).unwrap();

        let decision = context.evaluate(&Resource::of_type("node"), action);
        prop_assert!(decision.evaluations().len() >= rules.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Items never carry surrounding whitespace
    #[test]
    fn prop_split_items_are_trimmed(items in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let text = items.join(" ,  ");
        let split = split_items(&text);
        for item in &items {
            prop_assert!(split.contains(item.as_str()));
        }
        prop_assert!(split.iter().all(|s| s.trim() == s));
    }

    /// Trailing commas never produce an empty item
    #[test]
    fn prop_trailing_commas_dropped(item in "[a-z]{1,6}", commas in 1usize..4) {
        let text = format!("{item}{}", ",".repeat(commas));
        let split = split_items(&text);
        prop_assert_eq!(split.len(), 1);
        prop_assert!(split.contains(item.as_str()));
    }

    /// Splitting arbitrary input never panics
    #[test]
    fn prop_split_never_panics(text in ".*") {
        let _ = split_items(&text);
    }
}
