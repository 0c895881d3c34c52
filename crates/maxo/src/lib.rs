//! # Maxo
//!
//! Webhook delivery for MAX messenger bots, with one HTTP server able to
//! host many bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────────────┐     ┌────────────┐
//! │ WebhookServer│────▶│ Engine (route per mount) │────▶│ Dispatcher │
//! │   (axum)     │     │ security → parse → feed  │     │            │
//! └──────────────┘     └──────────────────────────┘     └────────────┘
//!                               │
//!                               └── TenantRegistry (token / bot id → Bot)
//! ```
//!
//! - **Engines**: [`SimpleEngine`](webhook::SimpleEngine) serves one bot,
//!   [`TokenEngine`](webhook::TokenEngine) and [`BotIdEngine`](webhook::BotIdEngine)
//!   resolve the bot from the request
//! - **Routing**: turns a URL template into a mount path and a subscription URL
//! - **Security**: secret header and IP allow-list checks
//! - **Runtime**: configuration, logging and the serve loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxo::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = WebhookRuntime::new();
//!     let settings = runtime.settings().clone();
//!
//!     let engine = TokenEngine::new(dispatcher, factory, PathRouting::new(settings.url()?)?)
//!         .configure(&settings)?;
//!     runtime.register(engine);
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use maxo_core as core;
pub use maxo_runtime as runtime;
pub use maxo_transport as transport;
pub use maxo_webhook as webhook;

/// Commonly used types for building a webhook service.
///
/// ```rust,ignore
/// use maxo::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use maxo_runtime::{ConfigureEngine, MaxoConfig, WebhookRuntime, WebhookSettings};

    // Bots and dispatch
    pub use maxo_core::{
        Bot, BotExt, BotFactory, BoxedBot, BoxedDispatcher, Dispatcher, Signal, Update,
        UpdateEnvelope, UpdateType,
    };

    // Engines
    pub use maxo_webhook::{
        BotIdEngine, LifecycleHook, SetWebhookOptions, SimpleEngine, TokenEngine, WebhookConfig,
        WebhookEngine,
    };

    // Routing and security
    pub use maxo_webhook::{
        BotIdRouting, PathBotIdRouting, PathRouting, Routing, Security, StaticRouting,
        StaticSecretToken, TokenRouting,
    };

    // Serving
    pub use maxo_transport::{AxumAdapter, WebhookServer, ip_filter_layer};

    // Logging
    pub use maxo_runtime::prelude::*;
}
