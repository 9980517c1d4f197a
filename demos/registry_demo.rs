//! Path registry walkthrough
//!
//! Run with: cargo run --example registry_demo [CONFIG_JSON]
//!
//! Without an argument a built-in configuration is used:
//!
//! ```json
//! {
//!   "cam1": { "record": false },
//!   "~^live/(.+)$": { "publishUser": "obs", "publishPass": "secret" }
//! }
//! ```
//!
//! Set `RUST_LOG=mediapath=debug` to see path creation, reloads and closures.

use std::sync::Arc;

use mediapath::auth::{AccessRequest, Protocol};
use mediapath::conf::{PathConfig, PathConfigs};
use mediapath::path::{MediaDescription, PathHandle};
use mediapath::registry::ReadinessListener;
use mediapath::PathRegistry;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = r#"{
    "cam1": { "record": false },
    "~^live/(.+)$": { "publishUser": "obs", "publishPass": "secret" }
}"#;

/// Listener that would start and stop HLS muxers
struct HlsManager;

impl ReadinessListener for HlsManager {
    fn path_ready(&self, path: &PathHandle) {
        println!("[hls] start muxer for {}", path.name());
    }

    fn path_not_ready(&self, path: &PathHandle) {
        println!("[hls] stop muxer for {}", path.name());
    }
}

async fn print_paths(registry: &PathRegistry) -> mediapath::Result<()> {
    let list = registry.list_paths().await?;
    println!("{}", serde_json::to_string_pretty(&list).unwrap_or_default());
    Ok(())
}

#[tokio::main]
async fn main() -> mediapath::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mediapath=info")),
        )
        .init();

    let confs = match std::env::args().nth(1) {
        Some(file) => PathConfigs::load(file)?,
        None => PathConfigs::from_json(DEFAULT_CONFIG)?,
    };

    let registry = PathRegistry::new(confs.clone());
    registry
        .set_readiness_listener(Some(Arc::new(HlsManager) as Arc<dyn ReadinessListener>))
        .await?;

    // RTMP encoder pushes to a regex path
    let publisher = registry
        .add_publisher(
            AccessRequest::publish("live/show")
                .protocol(Protocol::Rtmp, 1)
                .credentials("obs", "secret"),
        )
        .await?;
    publisher
        .start(MediaDescription::new(["H264", "MPEG-4 Audio"]))
        .await?;

    // Two players attach over different protocols
    let rtsp = registry
        .add_reader(AccessRequest::read("live/show").protocol(Protocol::Rtsp, 2))
        .await?;
    let _hls = registry
        .add_reader(AccessRequest::read("live/show").protocol(Protocol::Hls, 3))
        .await?;
    println!("RTSP reader got tracks {:?}", rtsp.description.tracks);

    print_paths(&registry).await?;

    // Turning on recording is applied in place
    let mut cam1 = PathConfig::new("cam1")?;
    cam1.record = true;
    registry.reload(confs.with(cam1)).await?;

    publisher.remove().await?;
    print_paths(&registry).await?;

    registry.shutdown().await;
    Ok(())
}
