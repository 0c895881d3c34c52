//! Unified error types for the maxo core.
//!
//! Webhook-level errors (routing, security, engines) are defined in
//! `maxo-webhook`; this module only covers the outbound bot API.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound Bot API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot has not been started or was already closed.
    #[error("bot is not started")]
    NotStarted,
    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The platform rejected the call.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The underlying HTTP client failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates an error from a platform error response.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
