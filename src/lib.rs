//! # mediapath
//!
//! Path registry for multi-protocol media streaming servers.
//!
//! A *path* is a named endpoint binding one publisher to any number of
//! readers. Protocol servers (RTSP, RTMP, HLS, WebRTC, ...) reach paths through
//! the [`PathRegistry`], which resolves names against the configuration,
//! authenticates requests, creates paths on demand and applies configuration
//! reloads without disturbing streams that are not affected.
//!
//! ```no_run
//! use mediapath::auth::{AccessRequest, Protocol};
//! use mediapath::conf::PathConfigs;
//! use mediapath::path::MediaDescription;
//! use mediapath::PathRegistry;
//!
//! # async fn example() -> mediapath::Result<()> {
//! let confs = PathConfigs::from_json(r#"{ "cam1": null, "~^live/.+$": null }"#)?;
//! let registry = PathRegistry::new(confs);
//!
//! let publisher = registry
//!     .add_publisher(AccessRequest::publish("live/show").protocol(Protocol::Rtmp, 1))
//!     .await?;
//! publisher.start(MediaDescription::new(["H264", "MPEG-4 Audio"])).await?;
//!
//! let reader = registry
//!     .add_reader(AccessRequest::read("live/show").protocol(Protocol::Hls, 2))
//!     .await?;
//! println!("reading {:?}", reader.description.tracks);
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod conf;
pub mod error;
pub mod path;
pub mod registry;

pub use error::{Error, Result};
pub use registry::{PathRegistry, RegistryConfig, RegistryError};
