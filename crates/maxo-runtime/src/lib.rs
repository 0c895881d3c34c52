//! # Maxo Runtime
//!
//! Runs webhook engines as a service:
//!
//! - [`config`]: layered `MaxoConfig` loading (files, `MAXO_*` env) and validation
//! - [`logging`]: `tracing-subscriber` setup driven by the `logging` section
//! - [`WebhookRuntime`]: mounts engines and serves them until Ctrl+C / SIGTERM
//!
//! ```ignore
//! use maxo_runtime::{ConfigureEngine, WebhookRuntime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = WebhookRuntime::new();
//!     let settings = runtime.settings().clone();
//!
//!     let engine = SimpleEngine::new(dispatcher, bot, StaticRouting::new(settings.url()?)?)
//!         .configure(&settings)?;
//!     let engine = runtime.register(engine);
//!     engine.set_webhook(settings.set_webhook_options()).await?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, MaxoConfig, WebhookSettings};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ConfigureEngine, RuntimeBuilder, WebhookRuntime, shutdown_signal};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and levels.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
