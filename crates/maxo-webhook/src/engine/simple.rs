//! Single-bot engine.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use maxo_core::{BoxedBot, BoxedDispatcher};
use tracing::info;

use super::core::EngineCore;
use super::{WebhookEngine, engine_builder_methods};
use crate::adapter::{BoundRequest, WebhookResponse};
use crate::config::SetWebhookOptions;
use crate::error::EngineResult;
use crate::lifecycle::LifecycleHook;
use crate::routing::Routing;

/// Serves one fixed bot at one URL.
pub struct SimpleEngine {
    core: EngineCore,
    bot: BoxedBot,
    routing: Box<dyn Routing>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl SimpleEngine {
    /// Creates an engine feeding `dispatcher` with updates for `bot`.
    pub fn new(dispatcher: BoxedDispatcher, bot: BoxedBot, routing: impl Routing) -> Self {
        Self {
            core: EngineCore::new(dispatcher),
            bot,
            routing: Box::new(routing),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    engine_builder_methods!();

    /// Returns the served bot.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns the routing strategy.
    pub fn routing(&self) -> &dyn Routing {
        self.routing.as_ref()
    }

    /// Starts the bot if needed and subscribes it to webhook delivery.
    pub async fn set_webhook(&self, options: SetWebhookOptions) -> EngineResult<BoxedBot> {
        self.ensure_started().await?;
        self.core
            .subscribe(
                &self.bot,
                || self.routing.webhook_point(self.bot.as_ref()),
                options,
            )
            .await?;
        Ok(self.bot.clone())
    }

    /// Removes the subscription for `url`, or for the routing URL by default.
    pub async fn delete_webhook(&self, url: Option<String>) -> EngineResult<()> {
        self.ensure_started().await?;
        let url = match url {
            Some(url) => url,
            None => self.routing.webhook_point(self.bot.as_ref())?,
        };
        self.core.unsubscribe(&self.bot, url).await
    }

    async fn ensure_started(&self) -> EngineResult<()> {
        if !self.bot.is_started() {
            self.bot.start().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LifecycleHook for SimpleEngine {
    async fn on_startup(&self) -> EngineResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.core.startup_bot(&self.bot).await?;
        info!(path = %self.path(), "Webhook engine started");
        Ok(())
    }

    async fn on_shutdown(&self) -> EngineResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.core.drain().await;
        self.core
            .shutdown_bots(std::slice::from_ref(&self.bot))
            .await?;
        info!(path = %self.path(), "Webhook engine stopped");
        Ok(())
    }
}

#[async_trait]
impl WebhookEngine for SimpleEngine {
    fn path(&self) -> &str {
        self.routing.path()
    }

    async fn handle_request(&self, request: BoundRequest) -> WebhookResponse {
        self.core.process(self.bot.clone(), &request).await
    }
}
