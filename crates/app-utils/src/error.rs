use core_policy::PolicyError;
use thiserror::Error;

/// Main errors for the `app-utils` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// YAML text could not be parsed
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The parsed document was rejected by the engine
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
