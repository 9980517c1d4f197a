//! Registry request protocol
//!
//! Every operation is a [`Command`] carrying a single-use reply channel
//! created by the caller. The control loop consumes commands strictly in
//! arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::auth::AccessRequest;
use crate::conf::{PathConfig, PathConfigs};
use crate::path::PathHandle;

use super::error::RegistryError;
use super::listener::ReadinessListener;

/// Reply channel for a registry request
pub(crate) type Reply<T> = oneshot::Sender<Result<T, RegistryError>>;

/// Inbound message of the registry control loop
pub(crate) enum Command {
    /// Replace the whole configuration set
    ReloadConf {
        confs: PathConfigs,
        res: oneshot::Sender<()>,
    },

    /// Install or clear the readiness listener
    SetListener {
        listener: Option<Arc<dyn ReadinessListener>>,
        res: oneshot::Sender<()>,
    },

    /// A path closed itself
    ClosePath(PathHandle),

    /// A path has a ready stream
    PathReady(PathHandle),

    /// A path lost its stream
    PathNotReady(PathHandle),

    /// Resolve and authenticate without touching paths
    GetConfForPath {
        req: AccessRequest,
        res: Reply<Arc<PathConfig>>,
    },

    /// Phase 1 of describe
    Describe {
        req: AccessRequest,
        res: Reply<PathHandle>,
    },

    /// Phase 1 of reader attach
    AddReader {
        req: AccessRequest,
        res: Reply<PathHandle>,
    },

    /// Phase 1 of publisher attach
    AddPublisher {
        req: AccessRequest,
        res: Reply<PathHandle>,
    },

    /// Collect every live path
    ListPaths { res: Reply<Vec<PathHandle>> },

    /// Look up a live path by name
    GetPath { name: String, res: Reply<PathHandle> },
}

impl Command {
    /// Short label for logging
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Command::ReloadConf { .. } => "reload_conf",
            Command::SetListener { .. } => "set_listener",
            Command::ClosePath(_) => "close_path",
            Command::PathReady(_) => "path_ready",
            Command::PathNotReady(_) => "path_not_ready",
            Command::GetConfForPath { .. } => "get_conf_for_path",
            Command::Describe { .. } => "describe",
            Command::AddReader { .. } => "add_reader",
            Command::AddPublisher { .. } => "add_publisher",
            Command::ListPaths { .. } => "list_paths",
            Command::GetPath { .. } => "get_path",
        }
    }
}

/// Channel a path uses to report back to the registry
#[derive(Clone)]
pub(crate) struct RegistryLink {
    tx: mpsc::Sender<Command>,
}

impl RegistryLink {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    /// Report that `path` became ready
    pub(crate) async fn path_ready(&self, path: &PathHandle) {
        self.notify(path, Command::PathReady(path.clone())).await;
    }

    /// Report that `path` is no longer ready
    pub(crate) async fn path_not_ready(&self, path: &PathHandle) {
        self.notify(path, Command::PathNotReady(path.clone())).await;
    }

    /// Report that `path` closed itself
    pub(crate) async fn close_path(&self, path: &PathHandle) {
        self.notify(path, Command::ClosePath(path.clone())).await;
    }

    /// Report "not ready" without waiting for room in the queue
    pub(crate) fn try_path_not_ready(&self, path: &PathHandle) {
        let _ = self.tx.try_send(Command::PathNotReady(path.clone()));
    }

    async fn notify(&self, path: &PathHandle, cmd: Command) {
        // The path lifetime is a child of the registry lifetime, and is
        // cancelled while the registry waits for this path to exit.
        tokio::select! {
            _ = self.tx.send(cmd) => {}
            _ = path.lifetime().cancelled() => {}
        }
    }
}
