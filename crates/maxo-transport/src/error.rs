//! Error types for serving webhook engines.

use maxo_webhook::EngineError;
use thiserror::Error;

/// Errors raised while running a webhook server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle hook failed.
    #[error("lifecycle hook failed: {0}")]
    Lifecycle(#[from] EngineError),

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
