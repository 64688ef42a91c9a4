//! Request resources
//!
//! A [`Resource`] is the attribute map describing the target of an
//! authorization request. Its `type` attribute selects the rule set that
//! governs it.

use crate::config::TYPE_PROPERTY;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a single resource attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Plain string value
    Text(String),
    /// Collection of strings (consulted by `contains` conditions)
    Set(Vec<String>),
}

impl AttributeValue {
    /// The string value, if this is a plain string
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Set(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Set(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(items: Vec<String>) -> Self {
        Self::Set(items)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(items: Vec<&str>) -> Self {
        Self::Set(items.into_iter().map(str::to_string).collect())
    }
}

/// Attribute map of the resource being accessed
///
/// ```
/// use core_policy::Resource;
///
/// let resource = Resource::of_type("job")
///     .with("group", "ops")
///     .with("job", "restart");
///
/// assert_eq!(resource.resource_type(), Some("job"));
/// assert_eq!(resource.text("group"), Some("ops"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource {
    attributes: BTreeMap<String, AttributeValue>,
}

impl Resource {
    /// Create a resource with no attributes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resource with the given `type` attribute
    #[must_use]
    pub fn of_type(resource_type: impl Into<String>) -> Self {
        Self::new().with(TYPE_PROPERTY, resource_type.into())
    }

    /// Add an attribute
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set an attribute in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Look up an attribute
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Look up an attribute holding a plain string
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_text)
    }

    /// The declared resource type
    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.text(TYPE_PROPERTY)
    }

    /// Iterate over all attributes in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Resource
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
