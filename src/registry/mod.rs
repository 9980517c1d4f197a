//! Path registry
//!
//! The registry maps stream names to live paths. A single control task owns
//! both indices, so name resolution, authentication and path creation are
//! serialized without locks.
//!
//! # Architecture
//!
//! ```text
//!   protocol servers        API layer         config watcher
//!   describe/add_reader/    list_paths/       reload
//!   add_publisher           get_path
//!         │                     │                 │
//!         └─────────────┬───────┴─────────────────┘
//!                       ▼
//!             mpsc<Command> + oneshot reply
//!                       │
//!          ┌────────────▼─────────────┐
//!          │ PathManager (1 task)     │
//!          │   confs: PathConfigs     │
//!          │   by_name: name → path   │
//!          │   by_conf: conf → {path} │
//!          └────────────┬─────────────┘
//!                       │ create / close+wait / hot-swap
//!         ┌─────────────┼──────────────┐
//!         ▼             ▼              ▼
//!      [Path]        [Path]         [Path]     (1 task each)
//! ```
//!
//! # Two-phase requests
//!
//! `describe`, `add_reader` and `add_publisher` first resolve the name,
//! authenticate and get-or-create the path inside the control task. The
//! caller then repeats the request on the returned path handle; that second
//! result is what the caller receives.
//!
//! # Reloads
//!
//! Each entry of the previous configuration is compared with the new one:
//! unchanged entries are left alone, entries differing only in hot-swappable
//! fields are pushed to their paths, and anything else closes the entry's
//! paths and waits for them to exit before continuing. Literal entries are
//! then (re)created; regex-derived paths come back on their next request.

pub(crate) mod command;
pub mod config;
pub mod error;
pub(crate) mod index;
pub mod lifetime;
pub mod listener;
pub mod resolve;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use lifetime::Lifetime;
pub use listener::ReadinessListener;
pub use resolve::{resolve, ResolvedPath};
pub use store::{DescribeResponse, PathRegistry};
