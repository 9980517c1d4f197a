//! Path error types

use thiserror::Error;

/// Error returned by a path when attaching or detaching sessions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path has no ready publisher
    #[error("no one is publishing to path '{0}'")]
    NoOnePublishing(String),

    /// Path already has a publisher and overriding is disabled
    #[error("someone is already publishing to path '{0}'")]
    AlreadyPublishing(String),

    /// Path is fed by a static source
    #[error("path '{0}' is not configured to accept publishers")]
    PublishingDisabled(String),

    /// `maxReaders` reached
    #[error("maximum reader count reached ({0})")]
    ReaderLimitReached(usize),

    /// Session ID does not belong to this path
    #[error("session {0} is not attached to this path")]
    UnknownSession(u64),

    /// Path has been closed
    #[error("terminated")]
    Terminated,
}
