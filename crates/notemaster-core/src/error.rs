//! Error types for notemaster-core

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::controller::ControllerError;

/// Result type alias using notemaster-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notemaster-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote service error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Credential validation or storage error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Controller operation failure
    #[error(transparent)]
    Controller(#[from] ControllerError),
}
