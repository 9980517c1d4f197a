//! Path configuration sets
//!
//! A [`PathConfigs`] is one immutable version of the whole `paths` section.
//! Reloading replaces the set as a whole.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::error::ConfError;
use super::path::{PathConfig, PathConfigDef};

/// Mapping of configuration key to path configuration
///
/// Keys are kept in ascending order, which is also the order in which regex
/// entries are tried during name resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathConfigs {
    entries: BTreeMap<String, Arc<PathConfig>>,
}

impl PathConfigs {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `key -> entry`
    ///
    /// A `null` entry is accepted and means "all defaults".
    ///
    /// ```
    /// use mediapath::conf::PathConfigs;
    ///
    /// let confs = PathConfigs::from_json(r#"{
    ///     "cam1": { "source": "rtsp://10.0.0.1/main" },
    ///     "~^live/(.+)$": { "publishUser": "obs", "publishPass": "secret" },
    ///     "all": null
    /// }"#).unwrap();
    ///
    /// assert_eq!(confs.len(), 3);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfError> {
        let raw: BTreeMap<String, Option<PathConfigDef>> = serde_json::from_str(json)?;

        let mut confs = Self::new();
        for (name, def) in raw {
            confs.insert(PathConfig::from_def(name, def.unwrap_or_default())?);
        }

        tracing::debug!(paths = confs.len(), "Path configuration parsed");

        Ok(confs)
    }

    /// Read and parse a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let confs = Self::from_json(&json)?;

        tracing::info!(
            file = %path.display(),
            paths = confs.len(),
            "Path configuration loaded"
        );

        Ok(confs)
    }

    /// Add or replace an entry under its own key
    pub fn insert(&mut self, conf: PathConfig) -> Option<Arc<PathConfig>> {
        self.entries.insert(conf.name.clone(), Arc::new(conf))
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, conf: PathConfig) -> Self {
        self.insert(conf);
        self
    }

    /// Remove an entry
    pub fn remove(&mut self, name: &str) -> Option<Arc<PathConfig>> {
        self.entries.remove(name)
    }

    /// Look up an entry by key
    pub fn get(&self, name: &str) -> Option<&Arc<PathConfig>> {
        self.entries.get(name)
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<PathConfig>)> {
        self.entries.iter()
    }

    /// Iterate over literal entries
    pub fn literals(&self) -> impl Iterator<Item = (&String, &Arc<PathConfig>)> {
        self.entries.iter().filter(|(_, conf)| !conf.is_pattern())
    }

    /// Iterate over regex entries in key order
    pub fn patterns(&self) -> impl Iterator<Item = (&String, &Arc<PathConfig>)> {
        self.entries.iter().filter(|(_, conf)| conf.is_pattern())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
