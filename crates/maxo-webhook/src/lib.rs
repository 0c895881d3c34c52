//! # Maxo Webhook
//!
//! Update ingestion over inbound webhook push, for one or many bots.
//!
//! ```text
//! request ─▶ WebAdapter::bind ─▶ WebhookEngine::handle_request
//!              │
//!              ├─ Routing        tenant key → bot (TenantRegistry)
//!              ├─ Security       secret header, client IP
//!              ├─ UpdateParser   JSON object → Update
//!              └─ Dispatcher     inline or via BackgroundTaskManager
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use maxo_webhook::{PathRouting, Security, StaticSecretToken, TokenEngine};
//!
//! let engine = TokenEngine::new(
//!     dispatcher,
//!     |token: &str| -> BoxedBot { Arc::new(HttpBot::new(token)) },
//!     PathRouting::new("https://example.com/webhook/bot/{bot_token}")?,
//! )
//! .with_security(Security::default().with_secret_token(StaticSecretToken::new("s3cret")));
//!
//! engine.set_webhook("123:abc", SetWebhookOptions::new()).await?;
//! ```

pub mod adapter;
pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod parsing;
pub mod registry;
pub mod routing;
pub mod security;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::{BoundRequest, WebAdapter, WebhookResponse, client_ip};
pub use background::{BackgroundTaskManager, DEFAULT_SHUTDOWN_TIMEOUT};
pub use config::{SetWebhookOptions, WebhookConfig};
pub use engine::{BotIdEngine, EngineCore, SimpleEngine, TokenEngine, WebhookEngine};
pub use error::{
    EngineError, EngineResult, ParseError, ParseResult, RoutingError, RoutingResult,
    SecurityError, SecurityResult,
};
pub use lifecycle::{BoxedLifecycleHook, DispatcherLifecycle, LifecycleHook};
pub use parsing::UpdateParser;
pub use registry::TenantRegistry;
pub use routing::{
    BotIdRouting, PathBotIdRouting, PathRouting, Routing, StaticRouting, TokenRouting,
};
pub use security::{
    BoxedSecurityCheck, DEFAULT_NETWORKS, IpCheck, IpFilter, IpNetwork, SECRET_HEADER, Security,
    SecurityCheck, StaticSecretToken,
};
