//! # Environmental Context
//!
//! A policy's optional `context` section gates it on request-scoped
//! attributes that are unrelated to the resource, such as the project a
//! request comes from:
//!
//! ```yaml
//! context:
//!   project: prod-.*
//!   application: rundeck
//! ```
//!
//! Each declared name becomes a property URI under the environment
//! namespace, paired with a full-string regex. The gate is all-or-nothing:
//! every declared property must be present in the request attributes with a
//! matching value. Undeclared attributes are ignored.

use crate::config::ENV_URI_BASE;
use crate::error::{PolicyError, Result};
use crate::pattern::PatternCache;
use regex::Regex;
use std::sync::Arc;
use url::Url;

/// A request-scoped attribute identified by a property URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Namespaced property identifier
    pub property: Url,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// Create an attribute from a property URI
    #[must_use]
    pub fn new(property: Url, value: impl Into<String>) -> Self {
        Self {
            property,
            value: value.into(),
        }
    }

    /// Create an attribute named under the default environment namespace
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidAttribute` if the name does not form a URI
    pub fn environment(name: &str, value: impl Into<String>) -> Result<Self> {
        Self::in_namespace(ENV_URI_BASE, name, value)
    }

    /// Create an attribute named under `namespace`
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidAttribute` if `namespace` and `name` do
    /// not form a URI
    pub fn in_namespace(namespace: &str, name: &str, value: impl Into<String>) -> Result<Self> {
        let property = format!("{namespace}{name}");
        let uri = Url::parse(&property)
            .map_err(|source| PolicyError::InvalidAttribute { property, source })?;
        Ok(Self::new(uri, value))
    }
}

/// All-must-match gate over request attributes
#[derive(Debug, Clone)]
pub struct EnvironmentalContext {
    declarations: Vec<(Url, Arc<Regex>)>,
}

impl EnvironmentalContext {
    /// Compile `(name, regex)` declarations under `namespace`
    ///
    /// Names that do not form a valid URI reference (RFC 3986) are skipped.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if a declared regex does not compile
    pub fn build(
        namespace: &str,
        declarations: &[(String, String)],
        cache: &PatternCache,
    ) -> Result<Self> {
        let mut compiled = Vec::with_capacity(declarations.len());
        for (name, pattern) in declarations {
            if !is_uri_reference(name) {
                tracing::debug!(name = %name, "skipping context property that is not a URI");
                continue;
            }
            let Ok(property) = Url::parse(&format!("{namespace}{name}")) else {
                tracing::debug!(name = %name, "skipping context property that is not a URI");
                continue;
            };
            compiled.push((property, cache.get_or_compile(pattern)?));
        }
        Ok(Self {
            declarations: compiled,
        })
    }

    /// True iff every declared property is satisfied by some attribute
    #[must_use]
    pub fn matches(&self, attributes: &[Attribute]) -> bool {
        self.declarations.iter().all(|(property, regex)| {
            attributes
                .iter()
                .any(|a| &a.property == property && regex.is_match(&a.value))
        })
    }

    /// Declared property URIs, in declaration order
    pub fn properties(&self) -> impl Iterator<Item = &Url> {
        self.declarations.iter().map(|(property, _)| property)
    }
}

/// Whether `name` may follow the namespace in an RFC 3986 URI.
///
/// URL parsing alone percent-encodes spaces and other illegal characters
/// instead of refusing them, so names are checked before parsing. Non-ASCII
/// letters are accepted, as is a single `#` starting a fragment.
fn is_uri_reference(name: &str) -> bool {
    const ALLOWED: &str = "-._~!$&'()*+,;=:@/?";

    let mut chars = name.chars();
    let mut fragment = false;
    while let Some(c) = chars.next() {
        match c {
            '%' => {
                let escaped = chars.next().is_some_and(|h| h.is_ascii_hexdigit())
                    && chars.next().is_some_and(|h| h.is_ascii_hexdigit());
                if !escaped {
                    return false;
                }
            }
            '#' if !fragment => fragment = true,
            c if c.is_ascii_alphanumeric() || ALLOWED.contains(c) => {}
            c if !c.is_ascii() && !c.is_control() && !c.is_whitespace() => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(declarations: &[(&str, &str)]) -> EnvironmentalContext {
        let declarations: Vec<(String, String)> = declarations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvironmentalContext::build(ENV_URI_BASE, &declarations, &PatternCache::new()).unwrap()
    }

    fn env(name: &str, value: &str) -> Attribute {
        Attribute::environment(name, value).unwrap()
    }

    #[test]
    fn test_all_declarations_required() {
        let ctx = gate(&[("project", "prod-.*"), ("application", "rundeck")]);
        assert!(ctx.matches(&[env("project", "prod-1"), env("application", "rundeck")]));
        assert!(!ctx.matches(&[env("project", "prod-1")]));
        assert!(!ctx.matches(&[env("project", "prod-1"), env("application", "other")]));
    }

    #[test]
    fn test_undeclared_attributes_ignored() {
        let ctx = gate(&[("project", "prod")]);
        assert!(ctx.matches(&[env("project", "prod"), env("time", "noon")]));
    }

    #[test]
    fn test_value_is_full_match() {
        let ctx = gate(&[("project", "prod")]);
        assert!(!ctx.matches(&[env("project", "production")]));
    }

    #[test]
    fn test_any_attribute_may_satisfy() {
        let ctx = gate(&[("project", "prod")]);
        assert!(ctx.matches(&[env("project", "dev"), env("project", "prod")]));
    }

    #[test]
    fn test_empty_context_matches() {
        assert!(gate(&[]).matches(&[]));
    }

    #[test]
    fn test_other_namespace_does_not_satisfy() {
        let ctx = gate(&[("project", "prod")]);
        let foreign = Attribute::in_namespace("urn:other:", "project", "prod").unwrap();
        assert!(!ctx.matches(&[foreign]));
    }

    #[test]
    fn test_unparsable_properties_are_skipped() {
        let declarations = vec![("project".to_string(), "prod".to_string())];
        let ctx =
            EnvironmentalContext::build("not a uri ", &declarations, &PatternCache::new()).unwrap();
        assert_eq!(ctx.properties().count(), 0);
    }

    #[test]
    fn test_malformed_names_are_skipped() {
        let ctx = gate(&[("my project", "prod"), ("a|b{c}", "x"), ("bad%zz", "y")]);
        assert_eq!(ctx.properties().count(), 0);
        assert!(ctx.matches(&[]));
    }

    #[test]
    fn test_skipped_names_leave_other_declarations() {
        let ctx = gate(&[("my project", "prod"), ("project", "prod")]);
        let names: Vec<&str> = ctx.properties().map(Url::as_str).collect();
        assert_eq!(names, ["http://dtolabs.com/rundeck/env/project"]);
        assert!(ctx.matches(&[env("project", "prod")]));
    }

    #[test]
    fn test_uri_reference_names() {
        assert!(is_uri_reference("project"));
        assert!(is_uri_reference("app:name@host/path?q=1#frag"));
        assert!(is_uri_reference("space%20ok"));
        assert!(is_uri_reference("projekt\u{e9}"));
        assert!(!is_uri_reference("a#b#c"));
        assert!(!is_uri_reference("tab\tname"));
        assert!(!is_uri_reference("%2"));
        assert!(!is_uri_reference("a\\b"));
    }

    #[test]
    fn test_invalid_regex_is_error() {
        let declarations = vec![("project".to_string(), "(".to_string())];
        assert!(
            EnvironmentalContext::build(ENV_URI_BASE, &declarations, &PatternCache::new()).is_err()
        );
    }
}
