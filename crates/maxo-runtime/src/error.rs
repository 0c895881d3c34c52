//! Runtime error types.

use maxo_transport::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while running the webhook runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or applied.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The server failed to bind, serve or run its lifecycle hooks.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
