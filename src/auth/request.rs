//! Access request types
//!
//! An access request describes who is trying to reach a path, through which
//! protocol, and for what purpose.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::Serialize;

/// Protocol the request arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Rtsp,
    Rtsps,
    Rtmp,
    Rtmps,
    Hls,
    WebRtc,
    Srt,
    /// In-process caller (e.g. a recorder or a relay)
    Internal,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Rtsp => "rtsp",
            Protocol::Rtsps => "rtsps",
            Protocol::Rtmp => "rtmp",
            Protocol::Rtmps => "rtmps",
            Protocol::Hls => "hls",
            Protocol::WebRtc => "webrtc",
            Protocol::Srt => "srt",
            Protocol::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// What the requester wants to do with the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read or describe the stream
    Read,
    /// Push a stream into the path
    Publish,
}

/// Plain credentials supplied by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    /// Create credentials from user and password
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

/// A request to describe, read or publish a path
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// Requested path name
    pub name: String,

    /// Raw query string from the client URL, if any
    pub query: String,

    /// Requested action
    pub action: Action,

    /// Client credentials
    pub credentials: Credentials,

    /// Client address
    pub ip: IpAddr,

    /// Protocol the request came from
    pub protocol: Protocol,

    /// Protocol-specific session ID, used in summaries
    pub session_id: u64,

    /// Bypass authentication for trusted internal callers
    pub skip_auth: bool,
}

impl AccessRequest {
    /// Create a read request with default context
    pub fn read(name: impl Into<String>) -> Self {
        Self::new(name, Action::Read)
    }

    /// Create a publish request with default context
    pub fn publish(name: impl Into<String>) -> Self {
        Self::new(name, Action::Publish)
    }

    fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            query: String::new(),
            action,
            credentials: Credentials::default(),
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            protocol: Protocol::Internal,
            session_id: 0,
            skip_auth: false,
        }
    }

    /// Set the credentials
    pub fn credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.credentials = Credentials::new(user, pass);
        self
    }

    /// Set the client address
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.ip = ip;
        self
    }

    /// Set the protocol context
    pub fn protocol(mut self, protocol: Protocol, session_id: u64) -> Self {
        self.protocol = protocol;
        self.session_id = session_id;
        self
    }

    /// Set the query string
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Skip authentication (trusted internal callers only)
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}
