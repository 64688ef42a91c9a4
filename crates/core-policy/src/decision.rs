//! Decision and explanation types
//!
//! A [`ContextDecision`] is the result of evaluating one resource and action
//! against a policy: the grant flag, the explanation code of the outcome, and
//! the ordered trail of [`ContextEvaluation`] steps that led there.

use core::fmt;
use serde::Serialize;

/// Closed set of explanation codes attached to decisions and evaluation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplanationCode {
    /// Access granted by a typed rule context
    Granted,
    /// A rule authorized the requested action
    GrantedActionsAndCommandsMatched,
    /// Access rejected, no rule authorized the action
    Rejected,
    /// A rule explicitly denied the action
    RejectedDenied,
    /// The policy document has no string `description`
    RejectedNoDescriptionProvided,
    /// The resource has no `type` attribute
    RejectedNoResourceType,
    /// The `for` section is present but not a map
    RejectedInvalidForSection,
    /// No rules are declared for the resource type
    RejectedNoRulesDeclared,
    /// A legacy rule matched but declares no actions
    RejectedActionsDeclaredEmpty,
    /// A legacy rule matched but none of its actions did
    RejectedNoActionsMatched,
    /// A rule section had an unexpected shape
    RejectedContextEvaluationError,
}

impl ExplanationCode {
    /// Canonical upper-case name of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::GrantedActionsAndCommandsMatched => "GRANTED_ACTIONS_AND_COMMANDS_MATCHED",
            Self::Rejected => "REJECTED",
            Self::RejectedDenied => "REJECTED_DENIED",
            Self::RejectedNoDescriptionProvided => "REJECTED_NO_DESCRIPTION_PROVIDED",
            Self::RejectedNoResourceType => "REJECTED_NO_RESOURCE_TYPE",
            Self::RejectedInvalidForSection => "REJECTED_INVALID_FOR_SECTION",
            Self::RejectedNoRulesDeclared => "REJECTED_NO_RULES_DECLARED",
            Self::RejectedActionsDeclaredEmpty => "REJECTED_ACTIONS_DECLARED_EMPTY",
            Self::RejectedNoActionsMatched => "REJECTED_NO_ACTIONS_MATCHED",
            Self::RejectedContextEvaluationError => "REJECTED_CONTEXT_EVALUATION_ERROR",
        }
    }

    /// True for the two granting codes
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted | Self::GrantedActionsAndCommandsMatched)
    }
}

impl fmt::Display for ExplanationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic step of an evaluation trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEvaluation {
    /// Explanation code of this step
    pub code: ExplanationCode,
    /// Human-readable explanation
    pub message: String,
}

impl ContextEvaluation {
    /// Create a new evaluation step
    #[must_use]
    pub fn new(code: ExplanationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ContextEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Outcome of evaluating a resource and action
///
/// Decisions are immutable once built; the evaluation trail is ordered from
/// the first rule or condition inspected to the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextDecision {
    code: ExplanationCode,
    granted: bool,
    evaluations: Vec<ContextEvaluation>,
}

impl ContextDecision {
    /// Create a decision from its parts
    #[must_use]
    pub fn new(code: ExplanationCode, granted: bool, evaluations: Vec<ContextEvaluation>) -> Self {
        Self {
            code,
            granted,
            evaluations,
        }
    }

    /// Rejection carrying a single evaluation with the same code
    #[must_use]
    pub fn rejected(code: ExplanationCode, message: impl Into<String>) -> Self {
        Self::new(code, false, vec![ContextEvaluation::new(code, message)])
    }

    /// Explanation code of the outcome
    #[must_use]
    pub const fn code(&self) -> ExplanationCode {
        self.code
    }

    /// Whether access is granted
    #[must_use]
    pub const fn granted(&self) -> bool {
        self.granted
    }

    /// Ordered evaluation trail
    #[must_use]
    pub fn evaluations(&self) -> &[ContextEvaluation] {
        &self.evaluations
    }

    /// Consume the decision, returning its evaluation trail
    #[must_use]
    pub fn into_evaluations(self) -> Vec<ContextEvaluation> {
        self.evaluations
    }

    /// Render the decision as YAML for audit tooling
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Serialization` if the decision cannot be encoded
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(|e| crate::PolicyError::Serialization(e.to_string()))
    }
}
