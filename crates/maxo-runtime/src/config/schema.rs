//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use maxo_core::UpdateType;
use maxo_transport::{AxumAdapter, DEFAULT_MAX_BODY_BYTES};
use maxo_webhook::{IpCheck, Security, SetWebhookOptions, StaticSecretToken, WebhookConfig};
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaxoConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Webhook server and engine settings.
    #[serde(default)]
    pub webhook: WebhookSettings,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation policy for file output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG` when set.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// File used when `output` is `file`.
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include file names and line numbers.
    pub file_location: bool,
    /// Per-module levels, e.g. `maxo_webhook = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Webhook
// =============================================================================

/// Webhook server and engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Address the HTTP server binds.
    pub listen_addr: String,

    /// Public webhook URL template, e.g.
    /// `https://example.com/webhook/bot/{bot_token}`.
    pub url: Option<String>,

    /// Shared secret expected in the secret header and sent on subscribe.
    pub secret: Option<String>,

    /// Dispatch updates after acknowledging the request.
    pub handle_in_background: bool,

    /// Grace period for background work on shutdown. `None` waits forever.
    pub shutdown_timeout_secs: Option<u64>,

    /// Subscribed update types. Empty means "whatever the handlers use".
    pub allowed_updates: Vec<UpdateType>,

    /// Ask the platform to drop queued updates on subscribe.
    pub drop_pending_updates: Option<bool>,

    /// Allowed client addresses or CIDR networks.
    pub ip_allowlist: Vec<String>,

    /// Also allow the platform's published delivery networks.
    pub include_default_networks: bool,

    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            url: None,
            secret: None,
            handle_in_background: true,
            shutdown_timeout_secs: Some(30),
            allowed_updates: Vec::new(),
            drop_pending_updates: None,
            ip_allowlist: Vec::new(),
            include_default_networks: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl WebhookSettings {
    /// Returns the configured URL template.
    pub fn url(&self) -> ConfigResult<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| ConfigError::missing_field("webhook.url"))
    }

    /// Returns the background shutdown timeout.
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the secret, treating an empty value as unset.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|secret| !secret.is_empty())
    }

    /// Builds the security chain: secret check first, then the IP check.
    pub fn security(&self) -> ConfigResult<Security> {
        let mut security = Security::default();
        if !self.ip_allowlist.is_empty() || self.include_default_networks {
            let check = IpCheck::new(&self.ip_allowlist, self.include_default_networks)?;
            security = security.with_check(check);
        }
        if let Some(secret) = self.secret() {
            security = security.with_secret_token(StaticSecretToken::new(secret));
        }
        Ok(security)
    }

    /// Builds the subscription settings.
    pub fn webhook_config(&self) -> WebhookConfig {
        let mut config = WebhookConfig::new().with_allowed_updates(self.allowed_updates.clone());
        if let Some(drop) = self.drop_pending_updates {
            config = config.with_drop_pending_updates(drop);
        }
        config
    }

    /// Builds default `set_webhook` options.
    pub fn set_webhook_options(&self) -> SetWebhookOptions {
        match self.secret() {
            Some(secret) => SetWebhookOptions::new().secret(secret),
            None => SetWebhookOptions::new(),
        }
    }

    /// Builds an axum adapter honoring the body limit.
    pub fn adapter(&self) -> AxumAdapter {
        AxumAdapter::new().with_max_body_bytes(self.max_body_bytes)
    }
}
