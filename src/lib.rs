// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 P47H Team <https://p47h.com>

//! # acl-open-core
//!
//! Access-control decisions over declarative YAML policy documents.
//!
//! This crate provides a unified API over the workspace:
//!
//! - **Policy Engine**: typed `for` rules with deny-overrides-allow, the
//!   legacy job-path dialect, and the environmental context gate
//! - **YAML Loading**: policy documents and engine options from YAML text
//!
//! ## Quick Start
//!
//! ```rust
//! use acl_open_core::yaml::{PolicyParser, YamlParser};
//! use acl_open_core::{ExplanationCode, Resource};
//!
//! let policy = YamlParser::new()
//!     .parse(
//!         "description: ops\nfor:\n  job:\n    - match:\n        group: 'ops/.*'\n      allow: run\n",
//!     )
//!     .unwrap();
//!
//! let job = Resource::of_type("job").with("group", "ops/deploy");
//! let decision = policy.includes(&job, "run").unwrap();
//! assert_eq!(decision.code(), ExplanationCode::Granted);
//! ```
//!
//! ## Architecture
//!
//! This facade crate re-exports the following modules:
//!
//! - [`policy`] - Decision engine (from `core-policy`)
//! - [`yaml`] - YAML loader (from `app-utils`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Policy engine module.
///
/// Re-exports `core_policy` for rule evaluation and decisions.
pub mod policy {
    pub use core_policy::*;
}

/// YAML loading module.
///
/// Re-exports `app_utils` for parsing policy documents and options.
pub mod yaml {
    pub use app_utils::yaml::*;
    pub use app_utils::{Error, Result};
}

// Convenience re-exports at root level
pub use core_policy::{ContextDecision, ExplanationCode, Policy, Resource};
