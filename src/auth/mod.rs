//! Access requests and authentication

pub mod gate;
pub mod request;

pub use gate::{AuthError, AuthGate, AuthMethod, AuthSettings, ConfigAuthGate};
pub use request::{AccessRequest, Action, Credentials, Protocol};
