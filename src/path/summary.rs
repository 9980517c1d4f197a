//! Read-only path snapshots for the API layer

use std::time::SystemTime;

use serde::Serialize;

use crate::auth::Protocol;

/// Tracks announced by a publisher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaDescription {
    /// Track descriptions, e.g. `"H264"` or `"MPEG-4 Audio"`
    pub tracks: Vec<String>,
}

impl MediaDescription {
    /// Create a description from track names
    pub fn new<I, S>(tracks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracks: tracks.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where a path's stream comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceInfo {
    /// A client pushing the stream
    #[serde(rename_all = "camelCase")]
    Publisher {
        id: u64,
        protocol: Protocol,
        session_id: u64,
    },
    /// A static source pulled by the server
    Static { url: String },
}

/// A session reading from a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderInfo {
    pub id: u64,
    pub protocol: Protocol,
    pub session_id: u64,
}

/// Snapshot of a live path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSummary {
    pub name: String,
    pub conf_name: String,
    pub source: Option<SourceInfo>,
    pub ready: bool,
    pub ready_time: Option<SystemTime>,
    pub tracks: Vec<String>,
    pub readers: Vec<ReaderInfo>,
    /// Whether the path currently records to disk
    pub record: bool,
}

impl PathSummary {
    /// Number of attached readers
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}

/// Snapshot of every live path, sorted by name
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathList {
    pub items: Vec<PathSummary>,
}
