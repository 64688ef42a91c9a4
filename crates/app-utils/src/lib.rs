//! # app-utils
//!
//! YAML loading for ACL policy documents.
//!
//! The engine in `core-policy` works on an already-parsed document tree.
//! This crate turns YAML text into that tree and hands it to
//! [`core_policy::Policy`].

#![forbid(unsafe_code)]

pub mod error;

pub mod yaml {
    //! YAML policy document parsing and serialization
    use crate::error::Result;
    use core_policy::{Policy, PolicyDocument, PolicyOptions};
    use serde::Serialize;

    /// Trait for policy parsers (OCP - extensible to JSON, TOML, etc.)
    pub trait PolicyParser {
        /// Parse a policy from a string
        fn parse(&self, input: &str) -> Result<Policy>;
    }

    /// YAML parser implementation
    #[derive(Debug, Default)]
    pub struct YamlParser {
        options: PolicyOptions,
    }

    impl YamlParser {
        /// Parser that builds policies with default options
        pub fn new() -> Self {
            Self::default()
        }

        /// Parser that builds every policy with `options`
        pub fn with_options(options: PolicyOptions) -> Self {
            Self { options }
        }
    }

    impl PolicyParser for YamlParser {
        fn parse(&self, input: &str) -> Result<Policy> {
            let document: PolicyDocument = serde_yaml::from_str(input)?;
            Ok(Policy::with_options(document, &self.options)?)
        }
    }

    /// Read engine options from YAML, missing keys take their defaults
    pub fn load_options(input: &str) -> Result<PolicyOptions> {
        if input.trim().is_empty() {
            return Ok(PolicyOptions::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    /// Serialize a value to YAML
    pub fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
        Ok(serde_yaml::to_string(value)?)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::error::Error;
        use core_policy::config::ENV_URI_BASE;
        use core_policy::{ExplanationCode, PolicyError, Resource};

        const POLICY: &str = r"
description: Admins manage nodes
by:
  group: admin
for:
  node:
    - match:
        hostname: 'web-.*'
      allow: [read, run]
";

        #[test]
        fn test_parse_and_evaluate() {
            let policy = YamlParser::new().parse(POLICY).unwrap();
            let node = Resource::of_type("node").with("hostname", "web-01");

            let decision = policy.includes(&node, "run").unwrap();
            assert_eq!(decision.code(), ExplanationCode::Granted);
            assert!(policy.groups().contains("admin"));
        }

        #[test]
        fn test_syntax_error_is_yaml_error() {
            let err = YamlParser::new().parse("for: [unclosed").unwrap_err();
            assert!(matches!(err, Error::Yaml(_)));
        }

        #[test]
        fn test_non_map_document_is_rejected() {
            let err = YamlParser::new().parse("- just\n- a list\n").unwrap_err();
            // serde_yaml reports the engine's conversion error as its own
            assert!(matches!(err, Error::Yaml(_)));
            assert!(err.to_string().contains("expected a map"));
        }

        #[test]
        fn test_bad_context_regex_is_policy_error() {
            let err = YamlParser::new()
                .parse("description: d\ncontext:\n  project: '(['\n")
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Policy(PolicyError::InvalidPattern { .. })
            ));
        }

        #[test]
        fn test_load_options() {
            let defaults = load_options("").unwrap();
            assert_eq!(defaults.environment_namespace, ENV_URI_BASE);

            let custom = load_options("environment_namespace: 'urn:acl:env:'\n").unwrap();
            assert_eq!(custom.environment_namespace, "urn:acl:env:");
        }

        #[test]
        fn test_parser_uses_options() {
            let options = load_options("environment_namespace: 'urn:acl:env:'\n").unwrap();
            let policy = YamlParser::with_options(options)
                .parse("description: d\ncontext:\n  project: prod\n")
                .unwrap();
            let property = policy.environment().unwrap().properties().next().unwrap();
            assert_eq!(property.as_str(), "urn:acl:env:project");
        }

        #[test]
        fn test_decision_to_yaml() {
            let policy = YamlParser::new().parse(POLICY).unwrap();
            let decision = policy.includes(&Resource::of_type("node"), "read").unwrap();
            let text = to_yaml(&decision).unwrap();
            assert!(text.contains("code: REJECTED"));
        }
    }
}

/// Re-export commonly used types
pub use error::{Error, Result};
pub use yaml::{load_options, PolicyParser, YamlParser};
