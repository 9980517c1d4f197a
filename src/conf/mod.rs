//! Path configuration
//!
//! This module provides:
//! - Per-path configuration entries with literal or regex keys
//! - Path name validation
//! - IP allow-lists
//! - JSON loading of whole configuration sets

pub mod error;
pub mod ip;
pub mod name;
pub mod path;
pub mod set;

pub use error::ConfError;
pub use ip::IpRange;
pub use name::{validate_path_name, NameError};
pub use path::{
    CameraTuning, PathConfig, PathConfigDef, PathMatcher, ALL_PATHS_KEY, SOURCE_PUBLISHER,
};
pub use set::PathConfigs;
