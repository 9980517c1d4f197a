//! Path handle
//!
//! A [`PathHandle`] is the only way to talk to a path actor. Cloning it is
//! cheap; two handles are equal only if they refer to the same path instance.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::auth::AccessRequest;
use crate::conf::PathConfig;
use crate::registry::{Lifetime, RegistryConfig};

use super::error::PathError;
use super::summary::{MediaDescription, PathSummary};

static NEXT_PATH_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) type PathReply<T> = oneshot::Sender<Result<T, PathError>>;

/// Inbound message of a path actor
pub(crate) enum PathCommand {
    Describe {
        req: AccessRequest,
        res: PathReply<MediaDescription>,
    },
    AddReader {
        req: AccessRequest,
        res: PathReply<ReaderSession>,
    },
    AddPublisher {
        req: AccessRequest,
        res: PathReply<PublisherSession>,
    },
    StartPublisher {
        id: u64,
        description: MediaDescription,
        res: PathReply<()>,
    },
    RemovePublisher {
        id: u64,
        res: PathReply<()>,
    },
    RemoveReader {
        id: u64,
        res: PathReply<()>,
    },
    Summary {
        res: PathReply<PathSummary>,
    },
    #[cfg(test)]
    Conf {
        res: PathReply<Arc<PathConfig>>,
    },
}

pub(crate) struct PathShared {
    id: u64,
    name: String,
    conf_name: String,
    matches: Vec<String>,
    runtime: RegistryConfig,
    tx: mpsc::Sender<PathCommand>,
    conf: watch::Sender<Arc<PathConfig>>,
    lifetime: Lifetime,
    exited: watch::Receiver<bool>,
}

/// Handle to a live path
#[derive(Clone)]
pub struct PathHandle {
    inner: Arc<PathShared>,
}

/// Attached publisher, returned by `add_publisher`
#[derive(Debug, Clone)]
pub struct PublisherSession {
    pub path: PathHandle,
    pub publisher_id: u64,
}

impl PublisherSession {
    /// Announce tracks and make the path ready
    pub async fn start(&self, description: MediaDescription) -> Result<(), PathError> {
        self.path.start_publisher(self.publisher_id, description).await
    }

    /// Detach the publisher
    pub async fn remove(&self) -> Result<(), PathError> {
        self.path.remove_publisher(self.publisher_id).await
    }
}

/// Attached reader, returned by `add_reader`
#[derive(Debug, Clone)]
pub struct ReaderSession {
    pub path: PathHandle,
    pub reader_id: u64,
    pub description: MediaDescription,
}

impl ReaderSession {
    /// Detach the reader
    pub async fn remove(&self) -> Result<(), PathError> {
        self.path.remove_reader(self.reader_id).await
    }
}

impl PathHandle {
    pub(crate) fn new(
        name: String,
        conf_name: String,
        matches: Vec<String>,
        runtime: RegistryConfig,
        lifetime: Lifetime,
        tx: mpsc::Sender<PathCommand>,
        conf: watch::Sender<Arc<PathConfig>>,
        exited: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(PathShared {
                id: NEXT_PATH_ID.fetch_add(1, Ordering::Relaxed),
                name,
                conf_name,
                matches,
                runtime,
                tx,
                conf,
                lifetime,
                exited,
            }),
        }
    }

    /// Handle with no actor behind it; every request fails with `Terminated`
    #[cfg(test)]
    pub(crate) fn detached(name: &str, conf_name: &str) -> Self {
        let (tx, _) = mpsc::channel(1);
        let conf = PathConfig::new(name).expect("valid path name");
        let (conf, _) = watch::channel(Arc::new(conf));
        let (_, exited) = watch::channel(true);
        let lifetime = Lifetime::new();
        lifetime.cancel();

        Self::new(
            name.to_string(),
            conf_name.to_string(),
            Vec::new(),
            RegistryConfig::default(),
            lifetime,
            tx,
            conf,
            exited,
        )
    }

    /// Process-unique instance ID
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Resolved path name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Key of the configuration entry the path was created from
    pub fn conf_name(&self) -> &str {
        &self.inner.conf_name
    }

    /// Regex capture groups used at creation (empty for literal paths)
    pub fn matches(&self) -> &[String] {
        &self.inner.matches
    }

    /// Runtime parameters shared by all paths
    pub fn runtime(&self) -> &RegistryConfig {
        &self.inner.runtime
    }

    pub(crate) fn lifetime(&self) -> &Lifetime {
        &self.inner.lifetime
    }

    /// Push a hot-swappable configuration change without waiting for it
    ///
    /// The actor applies it before serving any request sent afterwards. Only
    /// the latest pushed configuration is kept.
    pub fn reload_conf(&self, conf: Arc<PathConfig>) {
        self.inner.conf.send_replace(conf);
    }

    /// Begin shutting the path down
    pub fn close(&self) {
        self.inner.lifetime.cancel();
    }

    /// Wait until the path actor has fully stopped
    pub async fn wait(&self) {
        let mut exited = self.inner.exited.clone();
        // A dropped sender means the actor is gone as well
        let _ = exited.wait_for(|done| *done).await;
    }

    /// Whether the path actor has fully stopped
    pub fn has_exited(&self) -> bool {
        *self.inner.exited.borrow()
    }

    /// Get the stream description of a ready path
    pub async fn describe(&self, req: AccessRequest) -> Result<MediaDescription, PathError> {
        self.request(|res| PathCommand::Describe { req, res }).await
    }

    /// Attach a reader
    pub async fn add_reader(&self, req: AccessRequest) -> Result<ReaderSession, PathError> {
        self.request(|res| PathCommand::AddReader { req, res }).await
    }

    /// Attach a publisher
    pub async fn add_publisher(&self, req: AccessRequest) -> Result<PublisherSession, PathError> {
        self.request(|res| PathCommand::AddPublisher { req, res }).await
    }

    /// Announce the publisher's tracks and make the path ready
    pub async fn start_publisher(
        &self,
        id: u64,
        description: MediaDescription,
    ) -> Result<(), PathError> {
        self.request(|res| PathCommand::StartPublisher {
            id,
            description,
            res,
        })
        .await
    }

    /// Detach the publisher
    pub async fn remove_publisher(&self, id: u64) -> Result<(), PathError> {
        self.request(|res| PathCommand::RemovePublisher { id, res }).await
    }

    /// Detach a reader
    pub async fn remove_reader(&self, id: u64) -> Result<(), PathError> {
        self.request(|res| PathCommand::RemoveReader { id, res }).await
    }

    /// Snapshot of the path state
    pub async fn summary(&self) -> Result<PathSummary, PathError> {
        self.request(|res| PathCommand::Summary { res }).await
    }

    /// Configuration the actor is currently running with
    #[cfg(test)]
    pub(crate) async fn conf(&self) -> Result<Arc<PathConfig>, PathError> {
        self.request(|res| PathCommand::Conf { res }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(PathReply<T>) -> PathCommand,
    ) -> Result<T, PathError> {
        let (tx, rx) = oneshot::channel();

        tokio::select! {
            biased;
            _ = self.inner.lifetime.cancelled() => return Err(PathError::Terminated),
            sent = self.inner.tx.send(make(tx)) => {
                if sent.is_err() {
                    return Err(PathError::Terminated);
                }
            }
        }

        // A request queued while the actor exits is never answered
        tokio::select! {
            biased;
            reply = rx => reply.unwrap_or(Err(PathError::Terminated)),
            _ = self.wait() => Err(PathError::Terminated),
        }
    }
}

impl PartialEq for PathHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for PathHandle {}

impl fmt::Debug for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("conf_name", &self.inner.conf_name)
            .finish()
    }
}
