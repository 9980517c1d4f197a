//! Per-path configuration
//!
//! A configuration entry is keyed either by a literal path name (`cam1`) or by
//! a regular expression prefixed with `~` (`~^cams/(\d+)$`). The special key
//! `all` matches every name.

use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use super::error::ConfError;
use super::ip::IpRange;
use super::name::validate_path_name;

/// Source value meaning "the stream is pushed by a client"
pub const SOURCE_PUBLISHER: &str = "publisher";

/// Key alias matching every path name
pub const ALL_PATHS_KEY: &str = "all";

/// How a configuration entry matches path names
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Entry applies only to the path with the same name as its key
    Literal,
    /// Entry applies to every name matched by the expression
    Pattern(Regex),
}

impl PathMatcher {
    /// Match `name` and return the capture groups
    ///
    /// The first element is the whole match; groups that did not participate
    /// are returned as empty strings. Literal matchers never match here, they
    /// are looked up by key.
    pub fn captures(&self, name: &str) -> Option<Vec<String>> {
        match self {
            PathMatcher::Literal => None,
            PathMatcher::Pattern(re) => re.captures(name).map(|caps| {
                caps.iter()
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }),
        }
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PathMatcher::Literal, PathMatcher::Literal) => true,
            (PathMatcher::Pattern(a), PathMatcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Raspberry Pi camera tuning parameters
///
/// These can be changed on a live path without recreating it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraTuning {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub sharpness: f64,
    pub exposure: String,
    pub awb: String,
    pub denoise: String,
    /// Shutter time in microseconds (0 = auto)
    pub shutter: u32,
    pub metering: String,
    pub gain: f64,
    pub ev: f64,
    pub fps: f64,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            exposure: "normal".into(),
            awb: "auto".into(),
            denoise: "off".into(),
            shutter: 0,
            metering: "centre".into(),
            gain: 0.0,
            ev: 0.0,
            fps: 30.0,
        }
    }
}

/// Serialized form of a path configuration entry
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PathConfigDef {
    pub source: String,
    pub source_on_demand: bool,
    pub source_on_demand_start_timeout: String,
    pub source_on_demand_close_after: String,
    pub max_readers: usize,
    pub fallback: String,
    pub override_publisher: bool,
    pub publish_user: String,
    pub publish_pass: String,
    pub publish_ips: Vec<String>,
    pub read_user: String,
    pub read_pass: String,
    pub read_ips: Vec<String>,
    pub record: bool,
    pub record_path: String,
    #[serde(rename = "rpiCamera")]
    pub camera: CameraTuning,
}

impl Default for PathConfigDef {
    fn default() -> Self {
        Self {
            source: SOURCE_PUBLISHER.into(),
            source_on_demand: false,
            source_on_demand_start_timeout: "10s".into(),
            source_on_demand_close_after: "10s".into(),
            max_readers: 0,
            fallback: String::new(),
            override_publisher: true,
            publish_user: String::new(),
            publish_pass: String::new(),
            publish_ips: Vec::new(),
            read_user: String::new(),
            read_pass: String::new(),
            read_ips: Vec::new(),
            record: false,
            record_path: "./recordings/%path/%Y-%m-%d_%H-%M-%S-%f".into(),
            camera: CameraTuning::default(),
        }
    }
}

/// Configuration of a path or family of paths
///
/// Equality is structural. Every field except `record` and `camera` forces
/// live paths to be recreated when it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    /// Configuration key this entry was declared under
    pub name: String,
    pub matcher: PathMatcher,
    /// `publisher` or the URL of a static source
    pub source: String,
    pub source_on_demand: bool,
    pub source_on_demand_start_timeout: Duration,
    pub source_on_demand_close_after: Duration,
    /// Maximum number of readers (0 = unlimited)
    pub max_readers: usize,
    pub fallback: String,
    /// Whether a new publisher may kick out the current one
    pub override_publisher: bool,
    pub publish_user: String,
    pub publish_pass: String,
    pub publish_ips: Vec<IpRange>,
    pub read_user: String,
    pub read_pass: String,
    pub read_ips: Vec<IpRange>,
    pub record: bool,
    pub record_path: String,
    pub camera: CameraTuning,
}

impl PathConfig {
    /// Create an entry with default settings for the given key
    pub fn new(name: impl Into<String>) -> Result<Self, ConfError> {
        Self::from_def(name, PathConfigDef::default())
    }

    /// Build an entry from its serialized form
    pub fn from_def(name: impl Into<String>, def: PathConfigDef) -> Result<Self, ConfError> {
        let name = name.into();
        let matcher = parse_key(&name)?;

        if matches!(matcher, PathMatcher::Pattern(_)) && def.source != SOURCE_PUBLISHER {
            return Err(ConfError::Invalid {
                name,
                reason: format!(
                    "a path with a regular expression supports only source '{}'",
                    SOURCE_PUBLISHER
                ),
            });
        }

        if def.source_on_demand && def.source == SOURCE_PUBLISHER {
            return Err(ConfError::Invalid {
                name,
                reason: "sourceOnDemand requires a static source".into(),
            });
        }

        let publish_ips = parse_ips(def.publish_ips)?;
        let read_ips = parse_ips(def.read_ips)?;

        Ok(Self {
            name,
            matcher,
            source: def.source,
            source_on_demand: def.source_on_demand,
            source_on_demand_start_timeout: parse_duration(&def.source_on_demand_start_timeout)?,
            source_on_demand_close_after: parse_duration(&def.source_on_demand_close_after)?,
            max_readers: def.max_readers,
            fallback: def.fallback,
            override_publisher: def.override_publisher,
            publish_user: def.publish_user,
            publish_pass: def.publish_pass,
            publish_ips,
            read_user: def.read_user,
            read_pass: def.read_pass,
            read_ips,
            record: def.record,
            record_path: def.record_path,
            camera: def.camera,
        })
    }

    /// Whether this entry is keyed by a regular expression
    pub fn is_pattern(&self) -> bool {
        matches!(self.matcher, PathMatcher::Pattern(_))
    }

    /// Whether paths accept a client publisher
    pub fn accepts_publisher(&self) -> bool {
        self.source == SOURCE_PUBLISHER
    }

    /// Whether live paths can move from `self` to `new` without being recreated
    ///
    /// Only the recording toggle and the camera tuning block are hot-swappable;
    /// any other difference, including fields added later, requires recreation.
    pub fn can_be_updated(&self, new: &PathConfig) -> bool {
        let mut clone = self.clone();
        clone.record = new.record;
        clone.camera = new.camera.clone();
        clone == *new
    }
}

fn parse_key(name: &str) -> Result<PathMatcher, ConfError> {
    let pattern = if name == ALL_PATHS_KEY {
        "^.*$"
    } else if let Some(pattern) = name.strip_prefix('~') {
        pattern
    } else {
        validate_path_name(name).map_err(|source| ConfError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        return Ok(PathMatcher::Literal);
    };

    let re = Regex::new(pattern).map_err(|source| ConfError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })?;

    Ok(PathMatcher::Pattern(re))
}

fn parse_ips(raw: Vec<String>) -> Result<Vec<IpRange>, ConfError> {
    raw.into_iter().map(IpRange::try_from).collect()
}

/// Parse `1500ms`, `10s`, `2m` or `1h`; a bare number is seconds.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, ConfError> {
    let s = s.trim();
    let invalid = || ConfError::InvalidDuration(s.to_string());

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (value, unit) = s.split_at(split);
    let value: f64 = value.parse().map_err(|_| invalid())?;

    let secs = match unit {
        "" | "s" => value,
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => return Err(invalid()),
    };

    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}
