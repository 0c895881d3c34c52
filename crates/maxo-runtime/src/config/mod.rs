//! Configuration for the webhook runtime.
//!
//! Settings are layered with figment (defaults, files, `MAXO_*` environment
//! variables) and validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MaxoConfig, SpanEventConfig,
    WebhookSettings,
};
pub use validation::validate_config;
