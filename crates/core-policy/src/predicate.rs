//! Attribute predicates
//!
//! Three matching strategies back the rule condition sections:
//!
//! - [`Predicate::Regex`] (`match`): full-string regular expression match
//! - [`Predicate::Equals`] (`equals`): exact string equality
//! - [`Predicate::Contains`] (`contains`): the attribute, read as a set, is a
//!   superset of the declared items
//!
//! A missing attribute never satisfies a predicate.

use crate::resource::AttributeValue;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A single test applied to one resource attribute
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Full-string regex match against a string attribute
    Regex(Arc<Regex>),
    /// Exact equality with a string attribute
    Equals(String),
    /// Superset test against a comma-separated string or a set attribute
    Contains(BTreeSet<String>),
}

impl Predicate {
    /// `contains` predicate for a single declared item
    #[must_use]
    pub fn contains_item(item: impl Into<String>) -> Self {
        Self::Contains(BTreeSet::from([item.into()]))
    }

    /// Evaluate the predicate against an attribute value
    #[must_use]
    pub fn evaluate(&self, value: Option<&AttributeValue>) -> bool {
        match (self, value) {
            (_, None) => false,
            (Self::Regex(regex), Some(value)) => {
                value.as_text().is_some_and(|text| regex.is_match(text))
            }
            (Self::Equals(expected), Some(value)) => value.as_text() == Some(expected.as_str()),
            (Self::Contains(items), Some(AttributeValue::Text(text))) => {
                let input = split_items(text);
                items.iter().all(|item| input.contains(item))
            }
            (Self::Contains(items), Some(AttributeValue::Set(input))) => {
                items.iter().all(|item| input.contains(item))
            }
        }
    }
}

/// Read a comma-separated attribute as a set.
///
/// Trailing empty pieces are dropped before trimming, so `"a,b,"` yields
/// `{a, b}` while `"a, "` yields `{a, ""}`. Text without a comma is a
/// single item, even when empty.
#[must_use]
pub fn split_items(text: &str) -> BTreeSet<String> {
    if !text.contains(',') {
        return BTreeSet::from([text.trim().to_string()]);
    }
    let mut pieces: Vec<&str> = text.split(',').collect();
    while pieces.last().is_some_and(|p| p.is_empty()) {
        pieces.pop();
    }
    pieces.into_iter().map(|p| p.trim().to_string()).collect()
}
