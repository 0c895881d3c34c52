//! Multi-tenant engine keyed by the bot token in the request path.

use std::sync::Arc;

use async_trait::async_trait;
use maxo_core::{BotFactory, BoxedBot, BoxedDispatcher};
use tracing::{error, info};

use super::core::{EngineCore, bot_not_found, bot_unavailable};
use super::{WebhookEngine, engine_builder_methods};
use crate::adapter::{BoundRequest, WebhookResponse};
use crate::config::SetWebhookOptions;
use crate::error::EngineResult;
use crate::lifecycle::LifecycleHook;
use crate::registry::TenantRegistry;
use crate::routing::TokenRouting;

/// Serves any number of bots, creating one per token on first contact.
pub struct TokenEngine {
    core: EngineCore,
    routing: Box<dyn TokenRouting>,
    factory: Arc<dyn BotFactory>,
    registry: TenantRegistry<String>,
}

impl TokenEngine {
    /// Creates an engine building bots with `factory`.
    pub fn new(
        dispatcher: BoxedDispatcher,
        factory: impl BotFactory,
        routing: impl TokenRouting,
    ) -> Self {
        Self {
            core: EngineCore::new(dispatcher),
            routing: Box::new(routing),
            factory: Arc::new(factory),
            registry: TenantRegistry::new(),
        }
    }

    engine_builder_methods!();

    /// Returns the routing strategy.
    pub fn routing(&self) -> &dyn TokenRouting {
        self.routing.as_ref()
    }

    /// Returns the cached bot for `token`.
    pub fn bot(&self, token: &str) -> Option<BoxedBot> {
        self.registry.get(&token.to_string())
    }

    /// Returns the number of cached bots.
    pub fn bot_count(&self) -> usize {
        self.registry.len()
    }

    /// Caches a prepared bot under its token.
    ///
    /// Before [`LifecycleHook::on_startup`] the bot is started and signalled
    /// there; afterwards it is started and signalled before it can serve.
    /// Returns `false` if a bot with the same token is already cached.
    pub async fn add_bot(&self, bot: BoxedBot) -> EngineResult<bool> {
        self.registry
            .insert(bot.token().to_string(), bot, |bot| async move {
                self.core.activate_bot(&bot).await
            })
            .await
    }

    /// Returns the bot for `token`, creating and starting it if needed.
    pub async fn get_or_create_bot(&self, token: &str) -> EngineResult<BoxedBot> {
        self.registry
            .get_or_create(&token.to_string(), || {
                self.core.create_bot(self.factory.as_ref(), token)
            })
            .await
    }

    /// Subscribes the bot for `token` to webhook delivery.
    pub async fn set_webhook(
        &self,
        token: &str,
        options: SetWebhookOptions,
    ) -> EngineResult<BoxedBot> {
        let bot = self.get_or_create_bot(token).await?;
        self.core
            .subscribe(&bot, || self.routing.webhook_point(bot.as_ref()), options)
            .await?;
        Ok(bot)
    }

    /// Removes the subscription of the bot for `token`.
    ///
    /// An unknown token is served by a short-lived bot that never becomes a
    /// tenant.
    pub async fn delete_webhook(&self, token: &str, url: Option<String>) -> EngineResult<()> {
        let cached = self.bot(token);
        let bot = cached
            .clone()
            .unwrap_or_else(|| self.factory.create(token));
        let url = match url {
            Some(url) => url,
            None => self.routing.webhook_point(bot.as_ref())?,
        };

        match cached {
            Some(bot) => self.core.unsubscribe(&bot, url).await,
            None => self.core.unsubscribe_detached(bot, url).await,
        }
    }
}

#[async_trait]
impl LifecycleHook for TokenEngine {
    async fn on_startup(&self) -> EngineResult<()> {
        let started = self
            .registry
            .start_pending(|bot| async move { self.core.activate_bot(&bot).await })
            .await?;
        info!(path = %self.path(), bots = started, "Webhook engine started");
        Ok(())
    }

    async fn on_shutdown(&self) -> EngineResult<()> {
        self.core.drain().await;

        let bots: Vec<BoxedBot> = self
            .registry
            .drain()
            .await
            .into_iter()
            .map(|(_, bot)| bot)
            .collect();
        let result = self.core.shutdown_bots(&bots).await;

        info!(path = %self.path(), bots = bots.len(), "Webhook engine stopped");
        result
    }
}

#[async_trait]
impl WebhookEngine for TokenEngine {
    fn path(&self) -> &str {
        self.routing.path()
    }

    async fn handle_request(&self, request: BoundRequest) -> WebhookResponse {
        let Some(token) = self.routing.extract_token(&request) else {
            return bot_not_found();
        };

        let bot = match self.get_or_create_bot(&token).await {
            Ok(bot) => bot,
            Err(e) => {
                error!(error = %e, "Failed to initialize webhook bot");
                return bot_unavailable();
            }
        };

        self.core.process(bot, &request).await
    }
}
