//! Live path indices
//!
//! `by_name` holds exactly one path per name. `by_conf` groups paths by the
//! configuration entry they were created from. A path is in both or neither,
//! and empty groups are pruned.

use std::collections::HashMap;

use crate::path::PathHandle;

#[derive(Default)]
pub(crate) struct PathIndex {
    by_name: HashMap<String, PathHandle>,
    by_conf: HashMap<String, HashMap<u64, PathHandle>>,
}

impl PathIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a path under its name and configuration entry
    ///
    /// Returns the path previously registered under the same name, which has
    /// been removed from both indices.
    pub(crate) fn insert(&mut self, path: PathHandle) -> Option<PathHandle> {
        let previous = self.by_name.get(path.name()).cloned();
        if let Some(ref previous) = previous {
            self.remove(previous);
        }

        self.by_conf
            .entry(path.conf_name().to_string())
            .or_default()
            .insert(path.id(), path.clone());
        self.by_name.insert(path.name().to_string(), path);

        previous
    }

    /// Remove a path from both indices
    ///
    /// Only the exact instance is removed; a different path registered
    /// under the same name is left alone. Returns whether anything changed.
    pub(crate) fn remove(&mut self, path: &PathHandle) -> bool {
        if !self.is_current(path) {
            return false;
        }

        self.by_name.remove(path.name());

        if let Some(group) = self.by_conf.get_mut(path.conf_name()) {
            group.remove(&path.id());
            if group.is_empty() {
                self.by_conf.remove(path.conf_name());
            }
        }

        true
    }

    /// Whether `path` is the instance currently registered under its name
    pub(crate) fn is_current(&self, path: &PathHandle) -> bool {
        self.by_name.get(path.name()) == Some(path)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&PathHandle> {
        self.by_name.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Paths created from the configuration entry `conf_name`
    pub(crate) fn group(&self, conf_name: &str) -> Vec<PathHandle> {
        self.by_conf
            .get(conf_name)
            .map(|group| group.values().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn has_group(&self, conf_name: &str) -> bool {
        self.by_conf.contains_key(conf_name)
    }

    pub(crate) fn paths(&self) -> Vec<PathHandle> {
        self.by_name.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Remove every path, returning them
    pub(crate) fn drain(&mut self) -> Vec<PathHandle> {
        self.by_conf.clear();
        self.by_name.drain().map(|(_, path)| path).collect()
    }
}
