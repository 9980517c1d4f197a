//! Registry error types
//!
//! Error types returned to callers of the path registry.

use thiserror::Error;

use crate::auth::AuthError;
use crate::conf::NameError;
use crate::path::PathError;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Requested name is syntactically invalid
    #[error("invalid path name: {reason} ({name})")]
    InvalidPathName { name: String, reason: NameError },

    /// No configuration entry matches the name
    #[error("path '{0}' is not configured")]
    PathNotConfigured(String),

    /// The authentication gate refused the request
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthError),

    /// Registry is shutting down or has shut down
    #[error("terminated")]
    Terminated,

    /// No live path with this name
    #[error("path '{0}' not found")]
    NotFound(String),

    /// Failure reported by the path itself
    #[error(transparent)]
    Path(#[from] PathError),
}
