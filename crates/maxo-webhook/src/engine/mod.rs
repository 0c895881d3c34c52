//! Webhook engines.
//!
//! An engine owns one webhook route. Per request it:
//!
//! 1. resolves the tenant bot (`400 {"detail": "Bot not found"}` if absent)
//! 2. authenticates the request (`401`)
//! 3. checks the content type, JSON body and update schema (`400`)
//! 4. feeds the update to the dispatcher, in the background by default
//! 5. acknowledges with `200 {}`
//!
//! | engine | tenant key | bots |
//! |---|---|---|
//! | [`SimpleEngine`] | none | one fixed bot |
//! | [`TokenEngine`] | token from the path | created on first request |
//! | [`BotIdEngine`] | registered id from the path | created on first request |

mod bot_id;
mod core;
mod simple;
mod token;

use async_trait::async_trait;

use crate::adapter::BoundRequest;
use crate::adapter::WebhookResponse;
use crate::lifecycle::LifecycleHook;

pub use self::bot_id::BotIdEngine;
pub use self::core::{EngineCore, is_json_content_type};
pub use self::simple::SimpleEngine;
pub use self::token::TokenEngine;

/// A mounted webhook endpoint.
///
/// `handle_request` never fails: every input is answered with a
/// [`WebhookResponse`].
#[async_trait]
pub trait WebhookEngine: LifecycleHook {
    /// Returns the route path, placeholders included.
    fn path(&self) -> &str;

    /// Handles one inbound request.
    async fn handle_request(&self, request: BoundRequest) -> WebhookResponse;
}

/// Generates the shared builder methods of an engine wrapping an [`EngineCore`].
macro_rules! engine_builder_methods {
    () => {
        /// Enables request authentication.
        pub fn with_security(mut self, security: $crate::security::Security) -> Self {
            self.core.set_security(security);
            self
        }

        /// Sets the subscription settings.
        pub fn with_webhook_config(mut self, config: $crate::config::WebhookConfig) -> Self {
            self.core.set_webhook_config(config);
            self
        }

        /// Chooses between background (default) and inline update handling.
        pub fn with_handle_in_background(mut self, enabled: bool) -> Self {
            self.core.set_handle_in_background(enabled);
            self
        }

        /// Bounds the background drain on shutdown. `None` waits without bound.
        pub fn with_shutdown_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
            self.core.set_shutdown_timeout(timeout);
            self
        }

        /// Returns the shared engine core.
        pub fn core(&self) -> &$crate::engine::EngineCore {
            &self.core
        }
    };
}

pub(crate) use engine_builder_methods;
