//! Path actor
//!
//! Each path runs as its own task and owns its publisher and reader state.
//! Readiness changes and self-initiated closure are reported to the registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, watch};

use crate::auth::{AccessRequest, Protocol};
use crate::conf::PathConfig;
use crate::registry::command::RegistryLink;
use crate::registry::{Lifetime, RegistryConfig};

use super::error::PathError;
use super::handle::{PathCommand, PathHandle, PublisherSession, ReaderSession};
use super::summary::{MediaDescription, PathSummary, ReaderInfo, SourceInfo};

/// Mailbox depth of a path actor
const PATH_MAILBOX_CAPACITY: usize = 1;

/// Everything the registry decides when creating a path
pub(crate) struct PathParams {
    pub name: String,
    pub conf_name: String,
    pub conf: Arc<PathConfig>,
    pub matches: Vec<String>,
    pub runtime: RegistryConfig,
}

struct Publisher {
    id: u64,
    protocol: Protocol,
    session_id: u64,
    description: Option<MediaDescription>,
}

pub(crate) struct PathActor {
    handle: PathHandle,
    conf: Arc<PathConfig>,
    conf_updates: watch::Receiver<Arc<PathConfig>>,
    mailbox: mpsc::Receiver<PathCommand>,
    parent: RegistryLink,
    exited: watch::Sender<bool>,
    publisher: Option<Publisher>,
    readers: BTreeMap<u64, ReaderInfo>,
    ready_time: Option<SystemTime>,
    next_session_id: u64,
}

/// What the loop should do after a command
enum Flow {
    Continue,
    /// Close if the path is no longer needed
    CheckIdle,
}

impl PathActor {
    /// Create an actor and its handle; the caller spawns [`run`](Self::run)
    pub(crate) fn new(
        params: PathParams,
        lifetime: Lifetime,
        parent: RegistryLink,
    ) -> (PathHandle, Self) {
        let (tx, mailbox) = mpsc::channel(PATH_MAILBOX_CAPACITY);
        let (exited, exited_rx) = watch::channel(false);
        let (conf_tx, conf_updates) = watch::channel(Arc::clone(&params.conf));

        let handle = PathHandle::new(
            params.name,
            params.conf_name,
            params.matches,
            params.runtime,
            lifetime,
            tx,
            conf_tx,
            exited_rx,
        );

        let actor = Self {
            handle: handle.clone(),
            conf: params.conf,
            conf_updates,
            mailbox,
            parent,
            exited,
            publisher: None,
            readers: BTreeMap::new(),
            ready_time: None,
            next_session_id: 1,
        };

        (handle, actor)
    }

    pub(crate) async fn run(mut self) {
        let lifetime = self.handle.lifetime().clone();

        tracing::debug!(
            path = %self.handle.name(),
            conf = %self.handle.conf_name(),
            path_id = self.handle.id(),
            "Path created"
        );

        loop {
            // Configuration pushed before a request is applied before it
            tokio::select! {
                biased;
                _ = lifetime.cancelled() => break,
                changed = self.conf_updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.conf = Arc::clone(&self.conf_updates.borrow_and_update());
                    tracing::debug!(path = %self.handle.name(), "Path configuration reloaded");
                }
                cmd = self.mailbox.recv() => {
                    let Some(cmd) = cmd else { break };

                    if let Flow::CheckIdle = self.handle_command(cmd).await {
                        if self.is_idle() {
                            tracing::debug!(path = %self.handle.name(), "Path idle, closing");
                            self.parent.close_path(&self.handle).await;
                            lifetime.cancel();
                            break;
                        }
                    }
                }
            }
        }

        if self.is_ready() {
            self.parent.try_path_not_ready(&self.handle);
        }

        tracing::debug!(
            path = %self.handle.name(),
            path_id = self.handle.id(),
            "Path destroyed"
        );

        // Drain pending requests before announcing the exit
        self.mailbox.close();
        drop(self.mailbox);
        self.exited.send_replace(true);
    }

    async fn handle_command(&mut self, cmd: PathCommand) -> Flow {
        match cmd {
            PathCommand::Describe { req: _, res } => {
                let _ = res.send(self.describe());
                Flow::CheckIdle
            }
            PathCommand::AddReader { req, res } => {
                let _ = res.send(self.add_reader(req));
                Flow::CheckIdle
            }
            PathCommand::AddPublisher { req, res } => {
                let result = self.add_publisher(req).await;
                let _ = res.send(result);
                Flow::CheckIdle
            }
            PathCommand::StartPublisher {
                id,
                description,
                res,
            } => {
                let result = self.start_publisher(id, description).await;
                let _ = res.send(result);
                Flow::Continue
            }
            PathCommand::RemovePublisher { id, res } => {
                let result = match self.publisher.as_ref() {
                    Some(publisher) if publisher.id == id => {
                        self.remove_publisher().await;
                        Ok(())
                    }
                    _ => Err(PathError::UnknownSession(id)),
                };
                let _ = res.send(result);
                Flow::CheckIdle
            }
            PathCommand::RemoveReader { id, res } => {
                let result = match self.readers.remove(&id) {
                    Some(reader) => {
                        tracing::info!(
                            path = %self.handle.name(),
                            protocol = %reader.protocol,
                            session_id = reader.session_id,
                            readers = self.readers.len(),
                            "Reader removed"
                        );
                        Ok(())
                    }
                    None => Err(PathError::UnknownSession(id)),
                };
                let _ = res.send(result);
                Flow::CheckIdle
            }
            PathCommand::Summary { res } => {
                let _ = res.send(Ok(self.summary()));
                Flow::Continue
            }
            #[cfg(test)]
            PathCommand::Conf { res } => {
                let _ = res.send(Ok(Arc::clone(&self.conf)));
                Flow::Continue
            }
        }
    }

    fn describe(&self) -> Result<MediaDescription, PathError> {
        self.ready_description()
            .cloned()
            .ok_or_else(|| PathError::NoOnePublishing(self.handle.name().to_string()))
    }

    fn add_reader(&mut self, req: AccessRequest) -> Result<ReaderSession, PathError> {
        let description = self.describe()?;

        if self.conf.max_readers != 0 && self.readers.len() >= self.conf.max_readers {
            return Err(PathError::ReaderLimitReached(self.conf.max_readers));
        }

        let id = self.next_id();
        self.readers.insert(
            id,
            ReaderInfo {
                id,
                protocol: req.protocol,
                session_id: req.session_id,
            },
        );

        tracing::info!(
            path = %self.handle.name(),
            protocol = %req.protocol,
            session_id = req.session_id,
            readers = self.readers.len(),
            "Reader added"
        );

        Ok(ReaderSession {
            path: self.handle.clone(),
            reader_id: id,
            description,
        })
    }

    async fn add_publisher(&mut self, req: AccessRequest) -> Result<PublisherSession, PathError> {
        if !self.conf.accepts_publisher() {
            return Err(PathError::PublishingDisabled(self.handle.name().to_string()));
        }

        if self.publisher.is_some() {
            if !self.conf.override_publisher {
                return Err(PathError::AlreadyPublishing(self.handle.name().to_string()));
            }

            tracing::info!(path = %self.handle.name(), "Closing existing publisher");
            self.remove_publisher().await;
        }

        let id = self.next_id();
        self.publisher = Some(Publisher {
            id,
            protocol: req.protocol,
            session_id: req.session_id,
            description: None,
        });

        tracing::info!(
            path = %self.handle.name(),
            protocol = %req.protocol,
            session_id = req.session_id,
            "Publisher added"
        );

        Ok(PublisherSession {
            path: self.handle.clone(),
            publisher_id: id,
        })
    }

    async fn start_publisher(
        &mut self,
        id: u64,
        description: MediaDescription,
    ) -> Result<(), PathError> {
        let publisher = match self.publisher.as_mut() {
            Some(publisher) if publisher.id == id => publisher,
            _ => return Err(PathError::UnknownSession(id)),
        };

        let was_ready = publisher.description.is_some();
        tracing::info!(
            path = %self.handle.name(),
            tracks = description.tracks.len(),
            "Stream is ready"
        );
        publisher.description = Some(description);

        if !was_ready {
            self.ready_time = Some(SystemTime::now());
            self.parent.path_ready(&self.handle).await;
        }

        Ok(())
    }

    /// Detach the publisher and every reader
    async fn remove_publisher(&mut self) {
        let Some(publisher) = self.publisher.take() else {
            return;
        };

        tracing::info!(
            path = %self.handle.name(),
            session_id = publisher.session_id,
            readers = self.readers.len(),
            "Publisher removed"
        );

        if publisher.description.is_some() {
            self.ready_time = None;
            self.readers.clear();
            self.parent.path_not_ready(&self.handle).await;
        }
    }

    fn summary(&self) -> PathSummary {
        let source = match &self.publisher {
            Some(publisher) => Some(SourceInfo::Publisher {
                id: publisher.id,
                protocol: publisher.protocol,
                session_id: publisher.session_id,
            }),
            None if !self.conf.accepts_publisher() => Some(SourceInfo::Static {
                url: self.conf.source.clone(),
            }),
            None => None,
        };

        PathSummary {
            name: self.handle.name().to_string(),
            conf_name: self.handle.conf_name().to_string(),
            source,
            ready: self.is_ready(),
            ready_time: self.ready_time,
            tracks: self
                .ready_description()
                .map(|d| d.tracks.clone())
                .unwrap_or_default(),
            readers: self.readers.values().cloned().collect(),
            record: self.conf.record,
        }
    }

    fn ready_description(&self) -> Option<&MediaDescription> {
        self.publisher.as_ref().and_then(|p| p.description.as_ref())
    }

    fn is_ready(&self) -> bool {
        self.ready_description().is_some()
    }

    /// Regex-derived paths live only while someone uses them
    fn is_idle(&self) -> bool {
        self.conf.is_pattern() && self.publisher.is_none() && self.readers.is_empty()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_session_id;
        self.next_session_id += 1;
        id
    }
}
