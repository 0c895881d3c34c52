//! Multi-tenant engine keyed by a pre-registered numeric bot id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use maxo_core::{BotFactory, BoxedBot, BoxedDispatcher};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::core::{EngineCore, bot_not_found, bot_unavailable};
use super::{WebhookEngine, engine_builder_methods};
use crate::adapter::{BoundRequest, WebhookResponse};
use crate::config::SetWebhookOptions;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::LifecycleHook;
use crate::registry::TenantRegistry;
use crate::routing::BotIdRouting;

/// Serves bots registered by id, keeping tokens out of the URL.
///
/// Bots are cached by token, so two ids mapped to one token share a bot.
pub struct BotIdEngine {
    core: EngineCore,
    routing: Box<dyn BotIdRouting>,
    factory: Arc<dyn BotFactory>,
    registry: TenantRegistry<String>,
    tokens: RwLock<HashMap<i64, String>>,
}

impl BotIdEngine {
    /// Creates an engine building bots with `factory`.
    pub fn new(
        dispatcher: BoxedDispatcher,
        factory: impl BotFactory,
        routing: impl BotIdRouting,
    ) -> Self {
        Self {
            core: EngineCore::new(dispatcher),
            routing: Box::new(routing),
            factory: Arc::new(factory),
            registry: TenantRegistry::new(),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    engine_builder_methods!();

    /// Returns the routing strategy.
    pub fn routing(&self) -> &dyn BotIdRouting {
        self.routing.as_ref()
    }

    /// Maps `bot_id` to `token`, replacing any previous mapping.
    pub fn register_bot(&self, bot_id: i64, token: impl Into<String>) {
        self.tokens.write().insert(bot_id, token.into());
        debug!(bot_id, "Registered webhook bot id");
    }

    /// Removes the mapping for `bot_id`.
    ///
    /// A bot already created for it keeps serving other ids mapped to the
    /// same token and is closed on shutdown.
    pub fn unregister_bot(&self, bot_id: i64) -> Option<String> {
        let removed = self.tokens.write().remove(&bot_id);
        debug!(bot_id, removed = removed.is_some(), "Unregistered webhook bot id");
        removed
    }

    /// Returns whether `bot_id` is registered.
    pub fn is_registered(&self, bot_id: i64) -> bool {
        self.tokens.read().contains_key(&bot_id)
    }

    /// Returns the number of cached bots.
    pub fn bot_count(&self) -> usize {
        self.registry.len()
    }

    fn token_for(&self, bot_id: i64) -> Option<String> {
        self.tokens
            .read()
            .get(&bot_id)
            .filter(|token| !token.is_empty())
            .cloned()
    }

    /// Returns the bot for `bot_id`, creating and starting it if needed.
    pub async fn get_or_create_bot(&self, bot_id: i64) -> EngineResult<BoxedBot> {
        let token = self
            .token_for(bot_id)
            .ok_or(EngineError::BotNotRegistered(bot_id))?;
        self.registry
            .get_or_create(&token, || {
                self.core.create_bot(self.factory.as_ref(), &token)
            })
            .await
    }

    /// Subscribes the bot registered as `bot_id` to webhook delivery.
    pub async fn set_webhook(
        &self,
        bot_id: i64,
        options: SetWebhookOptions,
    ) -> EngineResult<BoxedBot> {
        let bot = self.get_or_create_bot(bot_id).await?;
        self.core
            .subscribe(
                &bot,
                || Ok(self.routing.webhook_point_for_id(bot_id)),
                options,
            )
            .await?;
        Ok(bot)
    }

    /// Removes the subscription of the bot registered as `bot_id`.
    ///
    /// A registered id whose bot was never created is served by a short-lived
    /// bot that never becomes a tenant.
    pub async fn delete_webhook(&self, bot_id: i64, url: Option<String>) -> EngineResult<()> {
        let token = self
            .token_for(bot_id)
            .ok_or(EngineError::BotNotRegistered(bot_id))?;
        let url = url.unwrap_or_else(|| self.routing.webhook_point_for_id(bot_id));

        match self.registry.get(&token) {
            Some(bot) => self.core.unsubscribe(&bot, url).await,
            None => {
                self.core
                    .unsubscribe_detached(self.factory.create(&token), url)
                    .await
            }
        }
    }
}

#[async_trait]
impl LifecycleHook for BotIdEngine {
    async fn on_startup(&self) -> EngineResult<()> {
        let started = self
            .registry
            .start_pending(|bot| async move { self.core.startup_bot(&bot).await })
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
impl WebhookEngine for BotIdEngine {
    fn path(&self) -> &str {
        self.routing.path()
    }

    async fn handle_request(&self, request: BoundRequest) -> WebhookResponse {
        let Some(bot_id) = self.routing.extract_bot_id(&request) else {
            return bot_not_found();
        };
        if self.token_for(bot_id).is_none() {
            return bot_not_found();
        }

        let bot = match self.get_or_create_bot(bot_id).await {
            Ok(bot) => bot,
            // Unregistered concurrently.
            Err(EngineError::BotNotRegistered(_)) => return bot_not_found(),
            Err(e) => {
                error!(error = %e, bot_id, "Failed to initialize webhook bot");
                return bot_unavailable();
            }
        };

        self.core.process(bot, &request).await
    }
}
