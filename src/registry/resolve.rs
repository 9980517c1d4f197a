//! Name resolution and configuration diffing

use std::sync::Arc;

use crate::conf::{validate_path_name, PathConfig, PathConfigs};

use super::error::RegistryError;

/// Configuration entry selected for a path name
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// Key of the matching entry
    pub conf_name: String,
    pub conf: Arc<PathConfig>,
    /// Capture groups of a regex match (empty for literal matches)
    pub matches: Vec<String>,
}

/// Find the configuration entry for `name`
///
/// A literal key equal to `name` always wins. Otherwise regex entries are
/// tried in ascending key order and the first match is returned.
pub fn resolve(confs: &PathConfigs, name: &str) -> Result<ResolvedPath, RegistryError> {
    validate_path_name(name).map_err(|reason| RegistryError::InvalidPathName {
        name: name.to_string(),
        reason,
    })?;

    if let Some(conf) = confs.get(name) {
        if !conf.is_pattern() {
            return Ok(ResolvedPath {
                conf_name: name.to_string(),
                conf: Arc::clone(conf),
                matches: Vec::new(),
            });
        }
    }

    for (conf_name, conf) in confs.patterns() {
        if let Some(matches) = conf.matcher.captures(name) {
            return Ok(ResolvedPath {
                conf_name: conf_name.clone(),
                conf: Arc::clone(conf),
                matches,
            });
        }
    }

    Err(RegistryError::PathNotConfigured(name.to_string()))
}

/// Effect of a reload on the paths of one configuration entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConfChange {
    /// Entry is identical
    Unchanged,
    /// Only hot-swappable fields differ; push the new entry to live paths
    HotSwap(Arc<PathConfig>),
    /// Some other field differs; live paths must be closed
    Recreate,
    /// Entry no longer exists; live paths must be closed
    Removed,
}

impl ConfChange {
    pub(crate) fn closes_paths(&self) -> bool {
        matches!(self, ConfChange::Recreate | ConfChange::Removed)
    }
}

/// Classify one entry of the previous configuration against the new one
pub(crate) fn classify(old: &PathConfig, new: Option<&Arc<PathConfig>>) -> ConfChange {
    match new {
        None => ConfChange::Removed,
        Some(new) if **new == *old => ConfChange::Unchanged,
        Some(new) if old.can_be_updated(new) => ConfChange::HotSwap(Arc::clone(new)),
        Some(_) => ConfChange::Recreate,
    }
}

/// Classify every entry of `old` against `new`, in key order
pub(crate) fn diff(old: &PathConfigs, new: &PathConfigs) -> Vec<(String, ConfChange)> {
    old.iter()
        .map(|(name, conf)| (name.clone(), classify(conf, new.get(name))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::NameError;

    fn confs() -> PathConfigs {
        PathConfigs::new()
            .with(PathConfig::new("cam1").unwrap())
            .with(PathConfig::new(r"~^cam(\d+)$").unwrap())
            .with(PathConfig::new(r"~^live/(.+)$").unwrap())
    }

    #[test]
    fn test_literal_wins_over_regex() {
        let resolved = resolve(&confs(), "cam1").unwrap();

        assert_eq!(resolved.conf_name, "cam1");
        assert!(resolved.matches.is_empty());
    }

    #[test]
    fn test_regex_match_with_captures() {
        let resolved = resolve(&confs(), "cam7").unwrap();

        assert_eq!(resolved.conf_name, r"~^cam(\d+)$");
        assert_eq!(resolved.matches, vec!["cam7".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_regex_precedence_follows_key_order() {
        let confs = PathConfigs::new()
            .with(PathConfig::new("~^b/.*$").unwrap())
            .with(PathConfig::new("~^.*$").unwrap());

        // "~^.*$" sorts before "~^b/.*$"
        let resolved = resolve(&confs, "b/x").unwrap();
        assert_eq!(resolved.conf_name, "~^.*$");
    }

    #[test]
    fn test_not_configured() {
        let result = resolve(&confs(), "other");
        assert_eq!(
            result.unwrap_err(),
            RegistryError::PathNotConfigured("other".into())
        );
    }

    #[test]
    fn test_invalid_name_checked_first() {
        let result = resolve(&confs(), "/cam1");
        assert_eq!(
            result.unwrap_err(),
            RegistryError::InvalidPathName {
                name: "/cam1".into(),
                reason: NameError::LeadingSlash,
            }
        );
    }

    #[test]
    fn test_diff() {
        let old = confs();

        let mut new = PathConfigs::new();
        let mut cam1 = PathConfig::new("cam1").unwrap();
        cam1.record = true;
        new.insert(cam1);
        let mut cams = PathConfig::new(r"~^cam(\d+)$").unwrap();
        cams.max_readers = 3;
        new.insert(cams);

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 3);
        assert!(matches!(changes[0], (ref n, ConfChange::HotSwap(_)) if n == "cam1"));
        assert_eq!(changes[1].1, ConfChange::Recreate);
        assert_eq!(changes[2].1, ConfChange::Removed);
        assert!(changes[2].1.closes_paths());
    }

    #[test]
    fn test_diff_identical_is_unchanged() {
        let changes = diff(&confs(), &confs());
        assert!(changes.iter().all(|(_, c)| *c == ConfChange::Unchanged));
    }
}
