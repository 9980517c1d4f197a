//! Crate-level error type

use thiserror::Error;

use crate::conf::ConfError;
use crate::path::PathError;
use crate::registry::RegistryError;

/// Any error produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Conf(#[from] ConfError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
