//! Typed policy document
//!
//! The document model arrives as a generic tree of maps, lists and scalars
//! (`serde_yaml::Value`). [`PolicyDocument`] converts it once into a typed
//! form. Shapes that the evaluator must still explain rather than reject at
//! load time (a `for` section that is not a map, a condition list holding a
//! number, an `allow` that is a map) are kept as explicit variants, so
//! evaluation never inspects raw values.
//!
//! ## Recognized layout
//!
//! ```yaml
//! id: ops-policy
//! description: Operators may run jobs
//! by:
//!   group: [ops, admin]
//! context:
//!   project: prod.*
//! for:
//!   job:
//!     - match:
//!         group: ops/.*
//!       allow: [read, run]
//!     - equals:
//!         name: wipe-db
//!       deny: '*'
//! rules:
//!   ops/.*:
//!     actions: read,run
//! ```

use crate::config::{
    ACTIONS_SECTION, CONTEXT_SECTION, FOR_SECTION, RULES_SECTION,
};
use crate::error::{PolicyError, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

const MATCH_SECTION: &str = "match";
const EQUALS_SECTION: &str = "equals";
const CONTAINS_SECTION: &str = "contains";
const ALLOW_ACTIONS: &str = "allow";
const DENY_ACTIONS: &str = "deny";

/// Identity clause: the subjects a policy applies to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByClause {
    /// Usernames named by `by.username`
    pub usernames: BTreeSet<String>,
    /// Groups named by `by.group`
    pub groups: BTreeSet<String>,
}

/// The top-level `for` section
#[derive(Debug, Clone, PartialEq)]
pub enum ForSection {
    /// No `for` key in the document
    Absent,
    /// `for` is present but is not a map
    Invalid,
    /// Rule sections keyed by resource type
    Types(BTreeMap<String, TypeSection>),
}

/// Rules declared for one resource type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSection {
    /// Ordered rule definitions
    Rules(Vec<RuleDefinition>),
    /// The type maps to something other than a list
    Invalid,
}

/// One entry of a `for.<type>` list
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    /// 1-based declaration position, for diagnostics
    pub index: usize,
    /// Compact rendering of the rule as written
    pub summary: String,
    /// Parsed rule body
    pub shape: RuleShape,
}

/// Body of a rule definition
#[derive(Debug, Clone, PartialEq)]
pub enum RuleShape {
    /// A map with any of the recognized sections
    Sections(RuleSections),
    /// The list entry is not a map; carries the kind of value found
    Malformed(&'static str),
}

/// Condition and action sections of a rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSections {
    /// `match`: key to regex or list of regexes
    pub match_section: Option<ConditionSection>,
    /// `equals`: key to exact string
    pub equals_section: Option<ConditionSection>,
    /// `contains`: key to item or list of items
    pub contains_section: Option<ConditionSection>,
    /// `allow`: granted actions
    pub allow: Option<ActionList>,
    /// `deny`: denied actions
    pub deny: Option<ActionList>,
}

/// A condition section (`match`, `equals` or `contains`)
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionSection {
    /// Key/value tests in document order
    Entries(Vec<(String, ConditionValue)>),
    /// Not a map, or a map with non-string keys
    Malformed,
}

/// Value side of a condition entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    /// A single string
    Single(String),
    /// A list of strings
    List(Vec<String>),
    /// Anything else
    Malformed,
}

/// An `allow` or `deny` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionList {
    /// Normalized action names
    Actions(BTreeSet<String>),
    /// Neither a string nor a list
    Invalid,
}

/// One entry of the legacy `rules` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRuleDefinition {
    /// Resource path regex
    pub key: LegacyRuleKey,
    /// The rule's `actions` field
    pub actions: LegacyActions,
}

/// Key of a legacy rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyRuleKey {
    /// Regex matched against `<group>/<job>`
    Pattern(String),
    /// A non-string key; carries the kind of value found
    Invalid(&'static str),
}

/// `actions` field of a legacy rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyActions {
    /// No `actions` declared
    Absent,
    /// Raw action string
    Text(String),
    /// Explicit action list
    List(Vec<String>),
    /// Neither a string nor a list
    Invalid,
}

/// A policy document in typed form
///
/// Created from the document model with [`PolicyDocument::from_value`], or
/// deserialized directly, which runs the same conversion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct PolicyDocument {
    id: Option<String>,
    description: Option<String>,
    by: ByClause,
    context: Option<Vec<(String, String)>>,
    for_section: ForSection,
    legacy_rules: Option<Vec<LegacyRuleDefinition>>,
}

impl TryFrom<Value> for PolicyDocument {
    type Error = PolicyError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

impl PolicyDocument {
    /// Convert a document-model tree into a typed document
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidDocument` if the top level is not a map
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Mapping(doc) = value else {
            return Err(PolicyError::InvalidDocument(format!(
                "expected a map at the top level, found {}",
                value_kind(value)
            )));
        };

        Ok(Self {
            id: doc.get("id").filter(|v| !v.is_null()).map(render),
            description: doc.get("description").and_then(Value::as_str).map(str::to_string),
            by: parse_by_clause(doc.get("by")),
            context: parse_context(doc.get(CONTEXT_SECTION)),
            for_section: parse_for_section(doc.get(FOR_SECTION)),
            legacy_rules: match doc.get(RULES_SECTION) {
                Some(Value::Mapping(rules)) => Some(parse_legacy_rules(rules)),
                _ => None,
            },
        })
    }

    /// Diagnostic identifier
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The required description, if present as a string
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Identity clause
    #[must_use]
    pub fn by(&self) -> &ByClause {
        &self.by
    }

    /// Environmental context declarations as `(property, regex)` pairs
    #[must_use]
    pub fn context(&self) -> Option<&[(String, String)]> {
        self.context.as_deref()
    }

    /// The `for` section
    #[must_use]
    pub fn for_section(&self) -> &ForSection {
        &self.for_section
    }

    /// Rules declared for `resource_type` under `for`
    #[must_use]
    pub fn type_section(&self, resource_type: &str) -> Option<&TypeSection> {
        match &self.for_section {
            ForSection::Types(types) => types.get(resource_type),
            ForSection::Absent | ForSection::Invalid => None,
        }
    }

    /// Legacy `rules` section, present only when it is a map
    #[must_use]
    pub fn legacy_rules(&self) -> Option<&[LegacyRuleDefinition]> {
        self.legacy_rules.as_deref()
    }
}

fn parse_by_clause(value: Option<&Value>) -> ByClause {
    let Some(Value::Mapping(by)) = value else {
        return ByClause::default();
    };
    ByClause {
        usernames: string_or_list(by.get("username")),
        groups: string_or_list(by.get("group")),
    }
}

/// A single string or the string members of a list; other members are skipped
fn string_or_list(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::String(s)) => BTreeSet::from([s.clone()]),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

fn parse_context(value: Option<&Value>) -> Option<Vec<(String, String)>> {
    let Some(Value::Mapping(ctx)) = value else {
        return None;
    };
    Some(
        ctx.iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
            .collect(),
    )
}

fn parse_for_section(value: Option<&Value>) -> ForSection {
    match value {
        None | Some(Value::Null) => ForSection::Absent,
        Some(Value::Mapping(types)) => ForSection::Types(
            types
                .iter()
                .filter_map(|(k, v)| {
                    let name = k.as_str()?;
                    let section = match v {
                        Value::Null => return None,
                        Value::Sequence(items) => TypeSection::Rules(
                            items
                                .iter()
                                .enumerate()
                                .map(|(i, item)| parse_rule(item, i + 1))
                                .collect(),
                        ),
                        _ => TypeSection::Invalid,
                    };
                    Some((name.to_string(), section))
                })
                .collect(),
        ),
        Some(_) => ForSection::Invalid,
    }
}

fn parse_rule(value: &Value, index: usize) -> RuleDefinition {
    let shape = match value {
        Value::Mapping(rule) => RuleShape::Sections(RuleSections {
            match_section: rule.get(MATCH_SECTION).map(parse_condition_section),
            equals_section: rule.get(EQUALS_SECTION).map(parse_condition_section),
            contains_section: rule.get(CONTAINS_SECTION).map(parse_condition_section),
            allow: rule.get(ALLOW_ACTIONS).map(parse_action_list),
            deny: rule.get(DENY_ACTIONS).map(parse_action_list),
        }),
        other => RuleShape::Malformed(value_kind(other)),
    };
    RuleDefinition {
        index,
        summary: render(value),
        shape,
    }
}

fn parse_condition_section(value: &Value) -> ConditionSection {
    let Value::Mapping(section) = value else {
        return ConditionSection::Malformed;
    };
    let mut entries = Vec::with_capacity(section.len());
    for (key, test) in section {
        let Some(key) = key.as_str() else {
            return ConditionSection::Malformed;
        };
        entries.push((key.to_string(), parse_condition_value(test)));
    }
    ConditionSection::Entries(entries)
}

fn parse_condition_value(value: &Value) -> ConditionValue {
    match value {
        Value::String(s) => ConditionValue::Single(s.clone()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map_or(ConditionValue::Malformed, ConditionValue::List),
        _ => ConditionValue::Malformed,
    }
}

fn parse_action_list(value: &Value) -> ActionList {
    match value {
        Value::String(s) => ActionList::Actions(BTreeSet::from([s.clone()])),
        Value::Sequence(items) => ActionList::Actions(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => ActionList::Invalid,
    }
}

fn parse_legacy_rules(rules: &Mapping) -> Vec<LegacyRuleDefinition> {
    rules
        .iter()
        .map(|(key, body)| LegacyRuleDefinition {
            key: match key {
                Value::String(s) => LegacyRuleKey::Pattern(s.clone()),
                other => LegacyRuleKey::Invalid(value_kind(other)),
            },
            actions: match body {
                Value::Mapping(body) => match body.get(ACTIONS_SECTION) {
                    None | Some(Value::Null) => LegacyActions::Absent,
                    Some(Value::String(s)) => LegacyActions::Text(s.clone()),
                    Some(Value::Sequence(items)) => LegacyActions::List(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    ),
                    Some(_) => LegacyActions::Invalid,
                },
                _ => LegacyActions::Absent,
            },
        })
        .collect()
}

/// Name of the kind of a document-model value
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged value",
    }
}

/// Compact single-line rendering used in diagnostics
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}={}", render(k), render(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, render(&tagged.value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> PolicyDocument {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_top_level_must_be_map() {
        let value: Value = serde_yaml::from_str("- a\n- b\n").unwrap();
        let err = PolicyDocument::from_value(&value).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidDocument(_)));
    }

    #[test]
    fn test_description_must_be_string() {
        assert_eq!(doc("description: 42\n").description(), None);
        assert_eq!(doc("description: ok\n").description(), Some("ok"));
    }

    #[test]
    fn test_by_clause_string_or_list() {
        let d = doc("by:\n  username: alice\n  group: [ops, 7, admin]\n");
        assert_eq!(d.by().usernames, BTreeSet::from(["alice".to_string()]));
        assert_eq!(
            d.by().groups,
            BTreeSet::from(["admin".to_string(), "ops".to_string()])
        );
    }

    #[test]
    fn test_for_section_shapes() {
        assert_eq!(doc("description: d\n").for_section(), &ForSection::Absent);
        assert_eq!(doc("for: [a]\n").for_section(), &ForSection::Invalid);
        let d = doc("for:\n  node: nope\n  job:\n");
        assert_eq!(d.type_section("node"), Some(&TypeSection::Invalid));
        assert_eq!(d.type_section("job"), None);
    }

    #[test]
    fn test_rule_sections() {
        let d = doc(concat!(
            "for:\n",
            "  node:\n",
            "    - match: {name: [a.*, b.*]}\n",
            "      equals: {env: [x]}\n",
            "      allow: [read, run]\n",
            "      deny: {bad: shape}\n",
            "    - just-a-string\n",
        ));
        let Some(TypeSection::Rules(rules)) = d.type_section("node") else {
            panic!("expected rules");
        };
        assert_eq!(rules.len(), 2);
        let RuleShape::Sections(sections) = &rules[0].shape else {
            panic!("expected sections");
        };
        assert_eq!(
            sections.match_section,
            Some(ConditionSection::Entries(vec![(
                "name".into(),
                ConditionValue::List(vec!["a.*".into(), "b.*".into()])
            )]))
        );
        assert_eq!(
            sections.allow,
            Some(ActionList::Actions(BTreeSet::from(["read".into(), "run".into()])))
        );
        assert_eq!(sections.deny, Some(ActionList::Invalid));
        assert_eq!(rules[1].index, 2);
        assert_eq!(rules[1].shape, RuleShape::Malformed("string"));
    }

    #[test]
    fn test_condition_list_with_number_is_malformed() {
        assert_eq!(
            parse_condition_value(&serde_yaml::from_str("[a, 1]").unwrap()),
            ConditionValue::Malformed
        );
    }

    #[test]
    fn test_legacy_rules_keep_document_order() {
        let d = doc(concat!(
            "rules:\n",
            "  z/.*: {actions: read}\n",
            "  a/.*: {actions: [run]}\n",
            "  7: {actions: read}\n",
            "  b/.*: {}\n",
        ));
        let rules = d.legacy_rules().unwrap();
        assert_eq!(rules[0].key, LegacyRuleKey::Pattern("z/.*".into()));
        assert_eq!(rules[1].actions, LegacyActions::List(vec!["run".into()]));
        assert_eq!(rules[2].key, LegacyRuleKey::Invalid("number"));
        assert_eq!(rules[3].actions, LegacyActions::Absent);
    }

    #[test]
    fn test_context_keeps_string_pairs_only() {
        let d = doc("context:\n  project: prod\n  count: 3\n");
        assert_eq!(
            d.context(),
            Some(&[("project".to_string(), "prod".to_string())][..])
        );
    }

    #[test]
    fn test_render_is_single_line() {
        let value: Value = serde_yaml::from_str("{allow: [read], match: {name: a.*}}").unwrap();
        assert_eq!(render(&value), "{allow=[read], match={name=a.*}}");
    }
}
