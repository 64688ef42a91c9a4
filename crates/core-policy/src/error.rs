//! Error types for core-policy
//!
//! Only genuine configuration defects surface here. Authoring anomalies that
//! can still be explained to the caller (missing description, malformed
//! sections, empty action lists) are reported as rejection decisions instead.

use thiserror::Error;

/// Result type alias for policy operations
pub type Result<T> = core::result::Result<T, PolicyError>;

/// Errors that can occur while loading or evaluating a policy
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy document is not a map at its top level
    #[error("Invalid policy document: {0}")]
    InvalidDocument(String),

    /// A regular expression declared in the policy failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern source text as written in the policy
        pattern: String,
        /// Underlying compilation error
        #[source]
        source: regex::Error,
    },

    /// An environment attribute property could not be expressed as a URI
    #[error("Invalid environment attribute '{property}': {source}")]
    InvalidAttribute {
        /// Property text that failed to parse
        property: String,
        /// Underlying URI parse error
        #[source]
        source: url::ParseError,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}
