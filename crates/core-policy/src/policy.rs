//! Policy facade
//!
//! A [`Policy`] binds one policy document's identity clause (the usernames
//! and groups it applies to), its optional environmental gate, and the
//! [`ContextRouter`] that makes resource decisions.
//!
//! Subject selection is left to the caller: it consults
//! [`Policy::usernames`] and [`Policy::groups`] to pick candidate policies,
//! checks [`Policy::environment`] against the request attributes, and then
//! asks [`Policy::includes`] for the resource decision.
//!
//! ## Example
//!
//! ```
//! use core_policy::{ExplanationCode, Policy, Resource};
//!
//! let value: serde_yaml::Value = serde_yaml::from_str(concat!(
//!     "description: operators\n",
//!     "by:\n",
//!     "  group: ops\n",
//!     "for:\n",
//!     "  node:\n",
//!     "    - allow: '*'\n",
//! )).unwrap();
//! let policy = Policy::from_value(&value).unwrap();
//!
//! assert!(policy.groups().contains("ops"));
//! let decision = policy.includes(&Resource::of_type("node"), "exec").unwrap();
//! assert_eq!(decision.code(), ExplanationCode::Granted);
//! ```

use crate::authorizer::AclContext;
use crate::config::PolicyOptions;
use crate::decision::ContextDecision;
use crate::document::PolicyDocument;
use crate::environment::EnvironmentalContext;
use crate::error::Result;
use crate::resource::Resource;
use crate::router::ContextRouter;
use core::fmt;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

/// One policy document ready for evaluation
///
/// Policies are immutable after construction apart from the per-type rule
/// cache inside the router, and can be shared across threads.
#[derive(Debug)]
pub struct Policy {
    document: Arc<PolicyDocument>,
    environment: Option<EnvironmentalContext>,
    router: ContextRouter,
}

impl Policy {
    /// Create a policy with default options and the process-wide pattern cache
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if a `context` regex does not compile
    pub fn new(document: PolicyDocument) -> Result<Self> {
        Self::with_options(document, &PolicyOptions::default())
    }

    /// Create a policy with explicit options
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if a `context` regex does not compile
    pub fn with_options(document: PolicyDocument, options: &PolicyOptions) -> Result<Self> {
        let cache = options.cache();
        let environment = document
            .context()
            .map(|declarations| {
                EnvironmentalContext::build(&options.environment_namespace, declarations, &cache)
            })
            .transpose()?;
        let document = Arc::new(document);

        Ok(Self {
            router: ContextRouter::new(Arc::clone(&document), cache),
            document,
            environment,
        })
    }

    /// Create a policy from a document-model tree
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidDocument` if the top level is not a map,
    /// or `PolicyError::InvalidPattern` for a bad `context` regex
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::new(PolicyDocument::from_value(value)?)
    }

    // ===== Accessors =====

    /// Diagnostic identifier from the `id` field
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.document.id()
    }

    /// The policy description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.document.description()
    }

    /// Usernames named in the `by` clause
    #[must_use]
    pub fn usernames(&self) -> &BTreeSet<String> {
        &self.document.by().usernames
    }

    /// Groups named in the `by` clause
    #[must_use]
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.document.by().groups
    }

    /// Environmental gate, when the policy declares a `context` map
    #[must_use]
    pub fn environment(&self) -> Option<&EnvironmentalContext> {
        self.environment.as_ref()
    }

    /// The router making resource decisions for this policy
    #[must_use]
    pub fn context(&self) -> &ContextRouter {
        &self.router
    }

    /// The typed document
    #[must_use]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    // ===== Evaluation =====

    /// Decide `action` on `resource`
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPattern` if the rules for the resource
    /// type contain a regex that does not compile
    #[instrument(
        level = "debug",
        skip(self, resource),
        fields(
            policy = self.id().unwrap_or("-"),
            resource_type = resource.resource_type().unwrap_or("-"),
        )
    )]
    pub fn includes(&self, resource: &Resource, action: &str) -> Result<ContextDecision> {
        let decision = self.router.evaluate(resource, action)?;
        tracing::trace!(code = %decision.code(), granted = decision.granted(), "policy decision");
        Ok(decision)
    }

    /// Shorthand for `includes(..)?.granted()`
    ///
    /// # Errors
    ///
    /// Same as [`Policy::includes`]
    pub fn is_allowed(&self, resource: &Resource, action: &str) -> Result<bool> {
        Ok(self.includes(resource, action)?.granted())
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Policy[id: {}, groups: ", self.id().unwrap_or("null"))?;
        for group in self.groups() {
            write!(f, "{group} ")?;
        }
        f.write_str("]")
    }
}

impl AclContext for Policy {
    fn includes(&self, resource: &Resource, action: &str) -> Result<ContextDecision> {
        Policy::includes(self, resource, action)
    }
}
