//! Error types for the webhook layer.
//!
//! Request-level failures never surface as errors: engines turn them into a
//! [`WebhookResponse`](crate::adapter::WebhookResponse). The types below cover
//! construction-time configuration and the explicit operations
//! (`set_webhook`, lifecycle hooks).

use maxo_core::{ApiError, Signal};
use thiserror::Error;

// =============================================================================
// Routing Errors
// =============================================================================

/// Error type for routing strategies.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// The URL template could not be parsed.
    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// A dynamic strategy's template lacks its placeholder.
    #[error(
        "Parameter '{param}' not found in URL template. Expected placeholder '{{{param}}}' in: {template}"
    )]
    MissingPlaceholder { param: String, template: String },
    /// The webhook point needs a bot id the bot does not know yet.
    #[error("bot id is unknown, start the bot before computing its webhook URL")]
    UnknownBotId,
}

// =============================================================================
// Security Errors
// =============================================================================

/// Error type for security check construction.
#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    /// An allow-list entry is neither an address nor a network.
    #[error("invalid IP entry '{entry}': {reason}")]
    InvalidIpEntry { entry: String, reason: String },
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Error type for update parsing.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The payload is valid JSON but not an object.
    #[error("webhook payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    /// The payload does not match any update schema.
    #[error("invalid webhook update payload: {0}")]
    InvalidPayload(String),
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Error type for engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// `set_webhook` was called for an id that has no registered token.
    #[error("Bot id {0} not registered")]
    BotNotRegistered(i64),
    /// The routing strategy could not produce a webhook URL.
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),
    /// A bot API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    /// The dispatcher rejected a lifecycle signal.
    #[error("dispatcher failed on {signal}: {reason}")]
    Signal { signal: Signal, reason: String },
}

impl EngineError {
    /// Wraps a dispatcher failure for `signal`.
    pub fn signal(signal: Signal, err: anyhow::Error) -> Self {
        Self::Signal {
            signal,
            reason: format!("{err:#}"),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for routing operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Result type for security check construction.
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Result type for update parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
