//! Authentication gate
//!
//! The registry treats authentication as an opaque, synchronous check. The
//! default [`ConfigAuthGate`] enforces the per-path IP lists and credentials;
//! deployments with an external authentication service plug in their own
//! [`AuthGate`].

use std::net::IpAddr;

use thiserror::Error;

use crate::conf::{IpRange, PathConfig};

use super::request::{AccessRequest, Action};

/// Client authentication scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Basic,
    Digest,
}

/// Server-wide authentication settings
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Accepted authentication schemes
    pub methods: Vec<AuthMethod>,

    /// URL of an external authentication service
    ///
    /// Interpreted only by gates that support it.
    pub external_url: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            methods: vec![AuthMethod::Basic],
            external_url: None,
        }
    }
}

/// Reason authentication was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Client address is not on the allow-list
    #[error("IP '{0}' not allowed")]
    IpNotAllowed(IpAddr),

    /// Credentials are missing or wrong
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Rejected by a custom gate
    #[error("{0}")]
    Rejected(String),
}

/// Decides whether an access request may proceed
pub trait AuthGate: Send + Sync + 'static {
    /// Check `req` against the resolved path configuration
    fn authenticate(
        &self,
        settings: &AuthSettings,
        conf: &PathConfig,
        req: &AccessRequest,
    ) -> Result<(), AuthError>;
}

impl<F> AuthGate for F
where
    F: Fn(&AuthSettings, &PathConfig, &AccessRequest) -> Result<(), AuthError>
        + Send
        + Sync
        + 'static,
{
    fn authenticate(
        &self,
        settings: &AuthSettings,
        conf: &PathConfig,
        req: &AccessRequest,
    ) -> Result<(), AuthError> {
        self(settings, conf, req)
    }
}

/// Gate driven by the per-path `publish*` / `read*` settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigAuthGate;

impl AuthGate for ConfigAuthGate {
    fn authenticate(
        &self,
        _settings: &AuthSettings,
        conf: &PathConfig,
        req: &AccessRequest,
    ) -> Result<(), AuthError> {
        let (ips, user, pass) = match req.action {
            Action::Publish => (&conf.publish_ips, &conf.publish_user, &conf.publish_pass),
            Action::Read => (&conf.read_ips, &conf.read_user, &conf.read_pass),
        };

        if !ips.is_empty() && !ip_allowed(ips, req.ip) {
            return Err(AuthError::IpNotAllowed(req.ip));
        }

        if !user.is_empty()
            && (req.credentials.user != *user || req.credentials.pass != *pass)
        {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(())
    }
}

fn ip_allowed(ips: &[IpRange], ip: IpAddr) -> bool {
    ips.iter().any(|range| range.contains(ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conf() -> PathConfig {
        let mut conf = PathConfig::new("cam1").unwrap();
        conf.publish_user = "obs".into();
        conf.publish_pass = "secret".into();
        conf.read_ips = vec!["10.0.0.0/8".parse().unwrap()];
        conf
    }

    #[test]
    fn test_publish_credentials() {
        let gate = ConfigAuthGate;
        let settings = AuthSettings::default();
        let conf = conf();

        let ok = AccessRequest::publish("cam1").credentials("obs", "secret");
        assert_eq!(gate.authenticate(&settings, &conf, &ok), Ok(()));

        let wrong = AccessRequest::publish("cam1").credentials("obs", "guess");
        assert_eq!(
            gate.authenticate(&settings, &conf, &wrong),
            Err(AuthError::InvalidCredentials)
        );

        let missing = AccessRequest::publish("cam1");
        assert_eq!(
            gate.authenticate(&settings, &conf, &missing),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_read_ip_allow_list() {
        let gate = ConfigAuthGate;
        let settings = AuthSettings::default();
        let conf = conf();

        let inside = AccessRequest::read("cam1").ip("10.1.2.3".parse().unwrap());
        assert_eq!(gate.authenticate(&settings, &conf, &inside), Ok(()));

        let outside_ip: IpAddr = "192.168.1.1".parse().unwrap();
        let outside = AccessRequest::read("cam1").ip(outside_ip);
        assert_eq!(
            gate.authenticate(&settings, &conf, &outside),
            Err(AuthError::IpNotAllowed(outside_ip))
        );
    }

    #[test]
    fn test_closure_gate() {
        let gate = |_: &AuthSettings, _: &PathConfig, req: &AccessRequest| {
            if req.query.contains("token=abc") {
                Ok(())
            } else {
                Err(AuthError::Rejected("missing token".into()))
            }
        };
        let settings = AuthSettings::default();
        let conf = conf();

        let req = AccessRequest::read("cam1").query("token=abc");
        assert!(gate.authenticate(&settings, &conf, &req).is_ok());
        assert!(gate
            .authenticate(&settings, &conf, &AccessRequest::read("cam1"))
            .is_err());
    }
}
