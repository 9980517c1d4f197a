//! Path actors
//!
//! A path binds at most one publisher to any number of readers under a single
//! name. Each path runs in its own task; the registry and protocol servers
//! reach it through a [`PathHandle`].
//!
//! ```text
//!   PathRegistry ──create/close/wait/reload──► PathHandle ──mailbox──► PathActor
//!        ▲                                          ▲                      │
//!        │            path_ready / path_not_ready / close_path             │
//!        └─────────────────────────────────────────────────────────────────┘
//!                                                   │
//!   protocol server ──describe/add_reader/add_publisher (phase 2)
//! ```

pub(crate) mod actor;
pub mod error;
pub mod handle;
pub mod summary;

pub use error::PathError;
pub use handle::{PathHandle, PublisherSession, ReaderSession};
pub use summary::{MediaDescription, PathList, PathSummary, ReaderInfo, SourceInfo};
