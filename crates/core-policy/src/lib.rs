// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # core-policy
//!
//! Access-control decision engine for declarative ACL policy documents.
//!
//! Given a policy document and a request (a resource attribute map plus an
//! action name), the engine returns a grant/deny [`ContextDecision`] with an
//! ordered explanation trail.
//!
//! This crate provides:
//! - Typed conversion of the document model ([`document`])
//! - Per-rule evaluation with `match`, `equals` and `contains` conditions
//!   ([`RuleMatcher`])
//! - Deny-overrides-allow aggregation per resource type ([`TypeContext`])
//! - The legacy path-regex `rules` dialect for jobs ([`LegacyRulesContext`])
//! - Routing and per-type caching ([`ContextRouter`]) behind the
//!   [`Policy`] facade
//! - The optional environmental gate ([`EnvironmentalContext`])
//!
//! ## Errors
//!
//! Authoring anomalies are rejections, not errors. Only a regular expression
//! that fails to compile, or a document whose top level is not a map, is
//! reported as a [`PolicyError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorizer;
pub mod config;
pub mod decision;
pub mod document;
pub mod environment;
pub mod error;
pub mod legacy;
pub mod pattern;
pub mod policy;
pub mod predicate;
pub mod resource;
pub mod resource_matcher;
pub mod router;

// Re-export commonly used types
pub use authorizer::{AclContext, TypeContext};
pub use config::PolicyOptions;
pub use decision::{ContextDecision, ContextEvaluation, ExplanationCode};
pub use document::PolicyDocument;
pub use environment::{Attribute, EnvironmentalContext};
pub use error::{PolicyError, Result};
pub use legacy::LegacyRulesContext;
pub use pattern::PatternCache;
pub use policy::Policy;
pub use resource::{AttributeValue, Resource};
pub use resource_matcher::{RuleMatcher, RuleOutcome};
pub use router::{ContextRouter, ScopedContext};
