//! Readiness listener
//!
//! Components that react to streams coming and going (an HLS muxer manager,
//! a recorder) register a listener with the registry. Callbacks run on the
//! registry control task and must not block.

use crate::path::PathHandle;

/// Receives path readiness changes
pub trait ReadinessListener: Send + Sync + 'static {
    /// `path` has a publisher with announced tracks
    fn path_ready(&self, path: &PathHandle);

    /// `path` lost its publisher
    fn path_not_ready(&self, path: &PathHandle);
}
