//! Path registry implementation
//!
//! The central registry that resolves path names, authenticates requests and
//! owns every live path. All state lives in a single control task; callers
//! talk to it through [`PathRegistry`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};

use crate::auth::{AccessRequest, AuthGate, AuthSettings, ConfigAuthGate};
use crate::conf::{PathConfig, PathConfigs};
use crate::path::actor::{PathActor, PathParams};
use crate::path::{
    MediaDescription, PathHandle, PathList, PathSummary, PublisherSession, ReaderSession,
};

use super::command::{Command, RegistryLink, Reply};
use super::config::RegistryConfig;
use super::error::RegistryError;
use super::index::PathIndex;
use super::lifetime::Lifetime;
use super::listener::ReadinessListener;
use super::resolve::{diff, resolve, ConfChange, ResolvedPath};

/// Request queue depth; a slow registry stalls its callers
const REGISTRY_QUEUE_CAPACITY: usize = 1;

/// Result of a successful describe
#[derive(Debug, Clone)]
pub struct DescribeResponse {
    pub path: PathHandle,
    pub description: MediaDescription,
}

/// Handle to the path registry
///
/// Must be created inside a Tokio runtime. Dropping the registry cancels it
/// without waiting; call [`shutdown`](Self::shutdown) to wait for every path
/// to stop.
pub struct PathRegistry {
    tx: mpsc::Sender<Command>,
    lifetime: Lifetime,
    task: Mutex<Option<JoinHandle<()>>>,
    exited: watch::Receiver<bool>,
}

impl PathRegistry {
    /// Create a registry with default settings and configuration-driven auth
    pub fn new(confs: PathConfigs) -> Self {
        Self::with_config(
            RegistryConfig::default(),
            AuthSettings::default(),
            Arc::new(ConfigAuthGate),
            confs,
        )
    }

    /// Create a registry with custom settings and authentication gate
    ///
    /// A path is created immediately for every literal configuration entry.
    pub fn with_config(
        config: RegistryConfig,
        auth: AuthSettings,
        gate: Arc<dyn AuthGate>,
        confs: PathConfigs,
    ) -> Self {
        let (tx, rx) = mpsc::channel(REGISTRY_QUEUE_CAPACITY);
        let lifetime = Lifetime::new();
        let (exited_tx, exited) = watch::channel(false);

        let mut manager = PathManager {
            config,
            auth,
            gate,
            confs,
            index: PathIndex::new(),
            children: JoinSet::new(),
            listener: None,
            lifetime: lifetime.clone(),
            link: RegistryLink::new(tx.clone()),
            rx,
            exited: exited_tx,
        };

        manager.create_static_paths();

        tracing::debug!(
            confs = manager.confs.len(),
            paths = manager.index.len(),
            "Path registry created"
        );

        let task = tokio::spawn(manager.run());

        Self {
            tx,
            lifetime,
            task: Mutex::new(Some(task)),
            exited,
        }
    }

    /// Stop the registry and wait for every path to exit
    ///
    /// Pending and later calls fail with [`RegistryError::Terminated`].
    pub async fn shutdown(&self) {
        tracing::debug!("Path registry is shutting down");
        self.lifetime.cancel();

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Path registry task failed");
            }
        }

        // Concurrent callers find the task already taken
        self.wait_exited().await;
    }

    async fn wait_exited(&self) {
        let mut exited = self.exited.clone();
        // A dropped sender means the control task is gone as well
        let _ = exited.wait_for(|done| *done).await;
    }

    /// Whether [`shutdown`](Self::shutdown) has been requested
    pub fn is_terminated(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Replace the whole path configuration
    ///
    /// Returns once paths that had to be closed have fully exited.
    pub async fn reload(&self, confs: PathConfigs) -> Result<(), RegistryError> {
        self.send(|res| Command::ReloadConf { confs, res }).await
    }

    /// Install or clear the readiness listener
    pub async fn set_readiness_listener(
        &self,
        listener: Option<Arc<dyn ReadinessListener>>,
    ) -> Result<(), RegistryError> {
        self.send(|res| Command::SetListener { listener, res }).await
    }

    /// Resolve and authenticate without creating a path
    pub async fn get_conf_for_path(
        &self,
        req: AccessRequest,
    ) -> Result<Arc<PathConfig>, RegistryError> {
        self.call(|res| Command::GetConfForPath { req, res }).await
    }

    /// Describe the stream of a path, creating the path if needed
    pub async fn describe(&self, req: AccessRequest) -> Result<DescribeResponse, RegistryError> {
        let path = self
            .call(|res| Command::Describe {
                req: req.clone(),
                res,
            })
            .await?;

        let description = path.describe(req).await?;
        Ok(DescribeResponse { path, description })
    }

    /// Attach a reader to a path, creating the path if needed
    pub async fn add_reader(&self, req: AccessRequest) -> Result<ReaderSession, RegistryError> {
        let path = self
            .call(|res| Command::AddReader {
                req: req.clone(),
                res,
            })
            .await?;

        Ok(path.add_reader(req).await?)
    }

    /// Attach a publisher to a path, creating the path if needed
    pub async fn add_publisher(
        &self,
        req: AccessRequest,
    ) -> Result<PublisherSession, RegistryError> {
        let path = self
            .call(|res| Command::AddPublisher {
                req: req.clone(),
                res,
            })
            .await?;

        Ok(path.add_publisher(req).await?)
    }

    /// Snapshot of every live path, sorted by name
    ///
    /// Paths that close while the snapshot is taken are left out.
    pub async fn list_paths(&self) -> Result<PathList, RegistryError> {
        let paths = self.call(|res| Command::ListPaths { res }).await?;

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            if let Ok(summary) = path.summary().await {
                items.push(summary);
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(PathList { items })
    }

    /// Snapshot of one live path
    pub async fn get_path(&self, name: &str) -> Result<PathSummary, RegistryError> {
        let path = self
            .call(|res| Command::GetPath {
                name: name.to_string(),
                res,
            })
            .await?;

        path.summary()
            .await
            .map_err(|_| RegistryError::NotFound(name.to_string()))
    }

    /// Send a request and wait for its reply, giving up when the registry ends
    async fn send<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RegistryError> {
        let (tx, rx) = oneshot::channel();

        tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => return Err(RegistryError::Terminated),
            sent = self.tx.send(make(tx)) => {
                if sent.is_err() {
                    return Err(RegistryError::Terminated);
                }
            }
        }

        // A request queued while the control task exits is never answered
        tokio::select! {
            biased;
            reply = rx => reply.map_err(|_| RegistryError::Terminated),
            _ = self.wait_exited() => Err(RegistryError::Terminated),
        }
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, RegistryError> {
        self.send(make).await?
    }
}

impl Drop for PathRegistry {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// State owned by the control task
struct PathManager {
    config: RegistryConfig,
    auth: AuthSettings,
    gate: Arc<dyn AuthGate>,
    confs: PathConfigs,
    index: PathIndex,
    children: JoinSet<()>,
    listener: Option<Arc<dyn ReadinessListener>>,
    lifetime: Lifetime,
    link: RegistryLink,
    rx: mpsc::Receiver<Command>,
    exited: watch::Sender<bool>,
}

impl PathManager {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.lifetime.cancelled() => break,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                Some(joined) = self.children.join_next(), if !self.children.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Path task failed");
                    }
                }
            }
        }

        self.close().await;
        self.rx.close();
        self.exited.send_replace(true);
    }

    /// Cancel every path and wait for all of them
    async fn close(&mut self) {
        self.lifetime.cancel();
        self.index.drain();
        self.listener = None;

        while let Some(joined) = self.children.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Path task failed");
            }
        }

        tracing::debug!("Path registry closed");
    }

    async fn handle_command(&mut self, cmd: Command) {
        tracing::trace!(command = cmd.kind(), "Registry request");

        match cmd {
            Command::ReloadConf { confs, res } => {
                self.reload(confs).await;
                let _ = res.send(());
            }
            Command::SetListener { listener, res } => {
                self.listener = listener;
                let _ = res.send(());
            }
            Command::ClosePath(path) => {
                if self.index.remove(&path) {
                    tracing::debug!(path = %path.name(), path_id = path.id(), "Path closed itself");
                } else {
                    tracing::debug!(
                        path = %path.name(),
                        path_id = path.id(),
                        "Ignoring close of superseded path"
                    );
                }
            }
            Command::PathReady(path) => {
                if let Some(listener) = &self.listener {
                    listener.path_ready(&path);
                }
            }
            Command::PathNotReady(path) => {
                if let Some(listener) = &self.listener {
                    listener.path_not_ready(&path);
                }
            }
            Command::GetConfForPath { req, res } => {
                let result = resolve(&self.confs, &req.name).and_then(|resolved| {
                    self.authenticate(&resolved.conf, &req)?;
                    Ok(resolved.conf)
                });
                let _ = res.send(result);
            }
            Command::Describe { req, res }
            | Command::AddReader { req, res }
            | Command::AddPublisher { req, res } => {
                let _ = res.send(self.get_or_create(&req));
            }
            Command::ListPaths { res } => {
                let _ = res.send(Ok(self.index.paths()));
            }
            Command::GetPath { name, res } => {
                let result = self
                    .index
                    .get(&name)
                    .cloned()
                    .ok_or(RegistryError::NotFound(name));
                let _ = res.send(result);
            }
        }
    }

    /// Phase 1 of describe / add_reader / add_publisher
    fn get_or_create(&mut self, req: &AccessRequest) -> Result<PathHandle, RegistryError> {
        let resolved = resolve(&self.confs, &req.name)?;

        if !req.skip_auth {
            self.authenticate(&resolved.conf, req)?;
        }

        if let Some(path) = self.index.get(&req.name) {
            return Ok(path.clone());
        }

        Ok(self.create_path(req.name.clone(), resolved))
    }

    fn authenticate(&self, conf: &PathConfig, req: &AccessRequest) -> Result<(), RegistryError> {
        self.gate
            .authenticate(&self.auth, conf, req)
            .map_err(|e| {
                tracing::info!(
                    path = %req.name,
                    protocol = %req.protocol,
                    ip = %req.ip,
                    error = %e,
                    "Authentication failed"
                );
                RegistryError::AuthenticationFailed(e)
            })
    }

    async fn reload(&mut self, confs: PathConfigs) {
        for (conf_name, change) in diff(&self.confs, &confs) {
            let group = self.index.group(&conf_name);

            match &change {
                ConfChange::Unchanged => continue,
                ConfChange::HotSwap(conf) => {
                    for path in &group {
                        path.reload_conf(Arc::clone(conf));
                    }
                }
                ConfChange::Recreate | ConfChange::Removed => {
                    for path in &group {
                        self.index.remove(path);
                        path.close();
                        // No two paths with the same name may bind a source
                        path.wait().await;
                    }
                }
            }

            tracing::debug!(
                conf = %conf_name,
                change = ?change,
                paths = group.len(),
                closed = change.closes_paths(),
                "Path configuration changed"
            );
        }

        self.confs = confs;
        self.create_static_paths();
    }

    /// Create a path for every literal entry that has none
    fn create_static_paths(&mut self) {
        let missing: Vec<(String, Arc<PathConfig>)> = self
            .confs
            .literals()
            .filter(|(name, _)| !self.index.contains(name))
            .map(|(name, conf)| (name.clone(), Arc::clone(conf)))
            .collect();

        for (name, conf) in missing {
            let resolved = ResolvedPath {
                conf_name: name.clone(),
                conf,
                matches: Vec::new(),
            };
            self.create_path(name, resolved);
        }
    }

    fn create_path(&mut self, name: String, resolved: ResolvedPath) -> PathHandle {
        let params = PathParams {
            name,
            conf_name: resolved.conf_name,
            conf: resolved.conf,
            matches: resolved.matches,
            runtime: self.config.clone(),
        };

        let (path, actor) = PathActor::new(params, self.lifetime.child(), self.link.clone());
        self.children.spawn(actor.run());
        self.index.insert(path.clone());

        path
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::auth::{AuthError, Protocol};
    use crate::path::PathError;

    #[derive(Default)]
    struct RecordingListener {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingListener {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ReadinessListener for RecordingListener {
        fn path_ready(&self, path: &PathHandle) {
            self.events.lock().unwrap().push(format!("ready {}", path.name()));
        }

        fn path_not_ready(&self, path: &PathHandle) {
            self.events.lock().unwrap().push(format!("not ready {}", path.name()));
        }
    }

    fn confs() -> PathConfigs {
        let mut secured = PathConfig::new("secured").unwrap();
        secured.publish_user = "obs".into();
        secured.publish_pass = "secret".into();

        PathConfigs::new()
            .with(PathConfig::new("cam1").unwrap())
            .with(secured)
            .with(PathConfig::new(r"~^live/(.+)$").unwrap())
    }

    #[tokio::test]
    async fn test_literal_paths_created_eagerly() {
        let registry = PathRegistry::new(confs());

        let list = registry.list_paths().await.unwrap();
        let names: Vec<_> = list.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cam1", "secured"]);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_regex_path_created_lazily() {
        let registry = PathRegistry::new(confs());

        let session = assert_ok!(registry.add_publisher(AccessRequest::publish("live/a")).await);
        assert_eq!(session.path.conf_name(), r"~^live/(.+)$");
        assert_eq!(session.path.matches(), ["live/a".to_string(), "a".to_string()]);

        let summary = registry.get_path("live/a").await.unwrap();
        assert_eq!(summary.conf_name, r"~^live/(.+)$");
        assert!(!summary.ready);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_auth_failure_does_not_create_path() {
        let registry = PathRegistry::new(confs());

        let err = registry
            .add_publisher(AccessRequest::publish("secured"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AuthenticationFailed(AuthError::InvalidCredentials)
        );

        let mut open = PathConfig::new(r"~^live/(.+)$").unwrap();
        open.read_user = "viewer".into();
        registry
            .reload(PathConfigs::new().with(open))
            .await
            .unwrap();

        let err = registry
            .describe(AccessRequest::read("live/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AuthenticationFailed(_)));
        assert_eq!(
            registry.get_path("live/x").await.unwrap_err(),
            RegistryError::NotFound("live/x".into())
        );

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_skip_auth() {
        let registry = PathRegistry::new(confs());

        assert_ok!(
            registry
                .add_publisher(AccessRequest::publish("secured").skip_auth())
                .await
        );

        // get_conf_for_path always authenticates
        assert_err!(
            registry
                .get_conf_for_path(AccessRequest::publish("secured").skip_auth())
                .await
        );
        let conf = registry
            .get_conf_for_path(AccessRequest::publish("secured").credentials("obs", "secret"))
            .await
            .unwrap();
        assert_eq!(conf.name, "secured");

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_phase_two_error_passed_through() {
        let registry = PathRegistry::new(confs());

        let err = registry
            .add_reader(AccessRequest::read("cam1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Path(PathError::NoOnePublishing("cam1".into()))
        );

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_readiness_listener() {
        let registry = PathRegistry::new(confs());
        let listener = Arc::new(RecordingListener::default());
        registry
            .set_readiness_listener(Some(listener.clone() as Arc<dyn ReadinessListener>))
            .await
            .unwrap();

        let publisher = registry
            .add_publisher(AccessRequest::publish("cam1").protocol(Protocol::Rtsp, 7))
            .await
            .unwrap();
        publisher
            .start(MediaDescription::new(["H264"]))
            .await
            .unwrap();

        let reader = registry
            .add_reader(AccessRequest::read("cam1").protocol(Protocol::Hls, 9))
            .await
            .unwrap();
        assert_eq!(reader.description.tracks, vec!["H264".to_string()]);

        publisher.remove().await.unwrap();

        // Notifications are queued ahead of this request
        registry.list_paths().await.unwrap();
        assert_eq!(listener.events(), vec!["ready cam1", "not ready cam1"]);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_terminated_after_shutdown() {
        let registry = PathRegistry::new(confs());
        let path = registry.get_path("cam1").await.unwrap();
        assert_eq!(path.name, "cam1");

        registry.shutdown().await;
        assert!(registry.is_terminated());

        assert_eq!(
            registry.list_paths().await.unwrap_err(),
            RegistryError::Terminated
        );
        assert_eq!(
            registry
                .add_publisher(AccessRequest::publish("cam1"))
                .await
                .unwrap_err(),
            RegistryError::Terminated
        );
        assert_eq!(
            registry.reload(confs()).await.unwrap_err(),
            RegistryError::Terminated
        );

        // A second shutdown returns immediately
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_hot_swap_reaches_path() {
        let registry = PathRegistry::new(confs());
        let session = registry
            .add_publisher(AccessRequest::publish("live/a"))
            .await
            .unwrap();

        let mut tuned = PathConfig::new(r"~^live/(.+)$").unwrap();
        tuned.record = true;
        tuned.camera.brightness = 0.4;
        registry.reload(confs().with(tuned.clone())).await.unwrap();

        let applied = session.path.conf().await.unwrap();
        assert!(applied.record);
        assert_eq!(applied.camera, tuned.camera);
        assert!(registry.get_path("live/a").await.unwrap().record);

        // Later pushes win over earlier ones
        let mut first = tuned.clone();
        first.camera.fps = 10.0;
        let mut second = tuned.clone();
        second.camera.fps = 60.0;
        registry.reload(confs().with(first)).await.unwrap();
        registry.reload(confs().with(second)).await.unwrap();

        assert_eq!(session.path.conf().await.unwrap().camera.fps, 60.0);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_shutdown_waits_for_paths() {
        let registry = Arc::new(PathRegistry::new(confs()));
        let session = registry
            .add_publisher(AccessRequest::publish("live/a"))
            .await
            .unwrap();

        let first = tokio::spawn({
            let registry = Arc::clone(&registry);
            async move { registry.shutdown().await }
        });
        registry.shutdown().await;

        assert!(session.path.has_exited());
        first.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_paths() {
        let registry = PathRegistry::new(confs());
        let session = registry
            .add_publisher(AccessRequest::publish("live/a"))
            .await
            .unwrap();

        registry.shutdown().await;

        // Every path has exited by the time shutdown returns
        session.path.wait().await;
        assert_eq!(
            session.path.summary().await.unwrap_err(),
            PathError::Terminated
        );
    }
}
