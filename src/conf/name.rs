//! Path name validation

use thiserror::Error;

/// Reason a path name was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    /// Name is empty
    #[error("cannot be empty")]
    Empty,
    /// Name starts with a slash
    #[error("can't begin with a slash")]
    LeadingSlash,
    /// Name ends with a slash
    #[error("can't end with a slash")]
    TrailingSlash,
    /// Name contains characters outside the allowed set
    #[error("can contain only alphanumeric characters, underscore, dot, tilde, colon, minus or slash")]
    InvalidCharacters,
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.' | '~' | ':')
}

/// Check that a name can identify a path.
pub fn validate_path_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    if name.starts_with('/') {
        return Err(NameError::LeadingSlash);
    }

    if name.ends_with('/') {
        return Err(NameError::TrailingSlash);
    }

    if !name.chars().all(is_allowed) {
        return Err(NameError::InvalidCharacters);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate_path_name("cam1"), Ok(()));
        assert_eq!(validate_path_name("live/stream_key-1.main"), Ok(()));
        assert_eq!(validate_path_name("site:a/~b"), Ok(()));
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(validate_path_name(""), Err(NameError::Empty));
        assert_eq!(validate_path_name("/cam"), Err(NameError::LeadingSlash));
        assert_eq!(validate_path_name("cam/"), Err(NameError::TrailingSlash));
        assert_eq!(validate_path_name("cam 1"), Err(NameError::InvalidCharacters));
        assert_eq!(validate_path_name("cam?x=1"), Err(NameError::InvalidCharacters));
    }
}
