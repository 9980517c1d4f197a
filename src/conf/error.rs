//! Configuration error types

use thiserror::Error;

use super::name::NameError;

/// Error produced while building or loading path configuration
#[derive(Debug, Error)]
pub enum ConfError {
    /// Literal key is not a valid path name
    #[error("invalid path name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: NameError,
    },

    /// Regex key does not compile
    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// IP allow-list entry cannot be parsed
    #[error("invalid IP address or range '{0}'")]
    InvalidIpRange(String),

    /// Duration string cannot be parsed
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    /// Field combination not allowed for this path
    #[error("path '{name}': {reason}")]
    Invalid { name: String, reason: String },

    /// Document is not valid JSON for a path configuration set
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
