//! Compiled pattern cache
//!
//! Policy documents repeat the same regular expressions across rules, types
//! and policies, so compiled patterns are memoized by their source text.
//! Entries are write-once and never evicted; the cache lives as long as the
//! policies that use it.
//!
//! All patterns compiled here use full-string semantics: `web.*` matches
//! `web01` but not `my-web01`.

use crate::error::{PolicyError, Result};
use dashmap::DashMap;
use regex::Regex;
use std::sync::{Arc, OnceLock};

static SHARED: OnceLock<Arc<PatternCache>> = OnceLock::new();

/// Concurrency-safe memo from regex source text to compiled pattern
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: DashMap<String, Arc<Regex>>,
}

impl PatternCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created on first use and never cleared
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Get the compiled pattern for `source`, compiling it on first use
    ///
    /// Concurrent first uses of the same source may both compile; the first
    /// stored pattern wins and every caller receives it.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if `source` is not a valid
    /// regular expression
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Regex>> {
        if let Some(compiled) = self.patterns.get(source) {
            return Ok(Arc::clone(compiled.value()));
        }

        let compiled = Arc::new(compile_full_match(source)?);
        let stored = self
            .patterns
            .entry(source.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(stored.value()))
    }

    /// Test `value` against `source` with full-string semantics
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if `source` does not compile
    pub fn is_full_match(&self, source: &str, value: &str) -> Result<bool> {
        Ok(self.get_or_compile(source)?.is_match(value))
    }

    /// Number of distinct patterns compiled so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if nothing has been compiled yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Compile `source` anchored at both ends.
///
/// The source is validated on its own first so that text which only parses
/// once wrapped (an unbalanced `)` closing the anchor group) is rejected.
fn compile_full_match(source: &str) -> Result<Regex> {
    let invalid = |source_err: regex::Error| {
        tracing::warn!(pattern = source, "policy pattern failed to compile");
        PolicyError::InvalidPattern {
            pattern: source.to_string(),
            source: source_err,
        }
    };

    Regex::new(source).map_err(invalid)?;
    Regex::new(&format!("^(?:{source})$")).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_string_semantics() {
        let cache = PatternCache::new();
        assert!(cache.is_full_match("web.*", "web01").unwrap());
        assert!(!cache.is_full_match("web.*", "my-web01").unwrap());
        assert!(!cache.is_full_match("a|b", "ab").unwrap());
        assert!(cache.is_full_match("a|b", "b").unwrap());
    }

    #[test]
    fn test_compiles_once_per_source() {
        let cache = PatternCache::new();
        let first = cache.get_or_compile("prod-.*").unwrap();
        let second = cache.get_or_compile("prod-.*").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let cache = PatternCache::new();
        let err = cache.get_or_compile("*z").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPattern { ref pattern, .. } if pattern == "*z"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unbalanced_group_is_rejected() {
        let cache = PatternCache::new();
        assert!(cache.get_or_compile("a)|(b").is_err());
    }

    #[test]
    fn test_shared_cache_is_single_instance() {
        assert!(Arc::ptr_eq(&PatternCache::shared(), &PatternCache::shared()));
    }
}
