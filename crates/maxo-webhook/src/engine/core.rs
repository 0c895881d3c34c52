//! Request pipeline shared by every engine.

use std::time::Duration;

use http::StatusCode;
use maxo_core::{
    ApiError, BotExt, BotFactory, BoxedBot, BoxedDispatcher, Signal, Subscribe, Unsubscribe,
    UpdateEnvelope,
};
use tracing::{debug, error, info, warn};

use crate::adapter::{BoundRequest, WebhookResponse};
use crate::background::{BackgroundTaskManager, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::config::{SetWebhookOptions, WebhookConfig};
use crate::error::{EngineResult, RoutingResult};
use crate::lifecycle::feed_signals;
use crate::parsing::{UpdateParser, json_kind};
use crate::security::Security;

/// State and steps common to all engines.
///
/// Engines resolve the tenant bot themselves and hand the rest of the
/// request to [`EngineCore::process`].
pub struct EngineCore {
    dispatcher: BoxedDispatcher,
    security: Option<Security>,
    webhook_config: WebhookConfig,
    parser: UpdateParser,
    background: BackgroundTaskManager,
    handle_in_background: bool,
    shutdown_timeout: Option<Duration>,
}

impl EngineCore {
    /// Creates a core feeding `dispatcher`, handling updates in the background.
    pub fn new(dispatcher: BoxedDispatcher) -> Self {
        Self {
            dispatcher,
            security: None,
            webhook_config: WebhookConfig::default(),
            parser: UpdateParser::new(),
            background: BackgroundTaskManager::new(),
            handle_in_background: true,
            shutdown_timeout: Some(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }

    pub(crate) fn set_security(&mut self, security: Security) {
        self.security = Some(security);
    }

    pub(crate) fn set_webhook_config(&mut self, config: WebhookConfig) {
        self.webhook_config = config;
    }

    pub(crate) fn set_handle_in_background(&mut self, enabled: bool) {
        self.handle_in_background = enabled;
    }

    pub(crate) fn set_shutdown_timeout(&mut self, timeout: Option<Duration>) {
        self.shutdown_timeout = timeout;
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &BoxedDispatcher {
        &self.dispatcher
    }

    /// Returns the security chain, if configured.
    pub fn security(&self) -> Option<&Security> {
        self.security.as_ref()
    }

    /// Returns the subscription settings.
    pub fn webhook_config(&self) -> &WebhookConfig {
        &self.webhook_config
    }

    /// Returns the background task manager.
    pub fn background(&self) -> &BackgroundTaskManager {
        &self.background
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    /// Authenticates, validates, parses and dispatches one request for `bot`.
    pub async fn process(&self, bot: BoxedBot, request: &BoundRequest) -> WebhookResponse {
        if let Some(security) = &self.security {
            if !security.verify(bot.as_ref(), request).await {
                warn!("Unauthorized webhook request");
                return WebhookResponse::text(StatusCode::UNAUTHORIZED, "Unauthorized");
            }
        }

        if !is_json_content_type(request.content_type()) {
            warn!(content_type = ?request.content_type(), "Invalid content type");
            return WebhookResponse::text(
                StatusCode::BAD_REQUEST,
                "Invalid Content-Type, expected JSON",
            );
        }

        let raw = match request.json() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Invalid webhook request body");
                return WebhookResponse::text(StatusCode::BAD_REQUEST, "Invalid JSON body");
            }
        };

        if !raw.is_object() {
            warn!(payload_type = json_kind(&raw), "Invalid webhook payload type");
            return WebhookResponse::text(
                StatusCode::BAD_REQUEST,
                "Webhook payload must be a JSON object",
            );
        }

        let update = match self.parser.parse(raw) {
            Ok(update) => update,
            Err(_) => {
                return WebhookResponse::text(
                    StatusCode::BAD_REQUEST,
                    "Invalid webhook update payload",
                );
            }
        };

        let envelope = UpdateEnvelope::new(update);
        debug!(update_type = %envelope.update_type(), "Dispatching webhook update");

        if self.handle_in_background {
            let dispatcher = self.dispatcher.clone();
            self.background
                .spawn(async move { dispatcher.feed(envelope, bot).await });
        } else if let Err(e) = self.dispatcher.feed(envelope, bot).await {
            error!(error = ?e, "Webhook update handling failed");
        }

        WebhookResponse::ok()
    }

    // =========================================================================
    // Bot lifecycle
    // =========================================================================

    /// Builds, starts and signals a new tenant bot.
    pub async fn create_bot(&self, factory: &dyn BotFactory, token: &str) -> EngineResult<BoxedBot> {
        let bot = factory.create(token);

        if let Err(e) = self.activate_bot(&bot).await {
            if let Err(close_err) = bot.close().await {
                warn!(error = %close_err, "Failed to close bot after startup failure");
            }
            return Err(e);
        }

        info!(bot_id = ?bot.bot_id(), "Webhook bot started");
        Ok(bot)
    }

    /// Starts `bot` if needed and feeds its startup signals.
    pub async fn activate_bot(&self, bot: &BoxedBot) -> EngineResult<()> {
        if !bot.is_started() {
            bot.start().await?;
        }
        self.startup_bot(bot).await
    }

    /// Feeds the startup signals for `bot`.
    pub async fn startup_bot(&self, bot: &BoxedBot) -> EngineResult<()> {
        feed_signals(&self.dispatcher, Signal::STARTUP, Some(bot)).await
    }

    /// Feeds the shutdown signals for every bot, then closes them all.
    ///
    /// Every bot is signalled and closed even if some step fails; the first
    /// failure is returned.
    pub async fn shutdown_bots(&self, bots: &[BoxedBot]) -> EngineResult<()> {
        let mut first_error = None;

        for bot in bots {
            if let Err(e) = feed_signals(&self.dispatcher, Signal::SHUTDOWN, Some(bot)).await {
                warn!(error = %e, bot_id = ?bot.bot_id(), "Shutdown signal failed");
                first_error.get_or_insert(e);
            }
        }

        for bot in bots {
            match bot.close().await {
                Ok(()) => debug!(bot_id = ?bot.bot_id(), "Webhook bot closed"),
                Err(e) => {
                    warn!(error = %e, bot_id = ?bot.bot_id(), "Failed to close webhook bot");
                    first_error.get_or_insert(e.into());
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Waits for background handlers, bounded by the shutdown timeout.
    pub async fn drain(&self) {
        self.background.wait_all(self.shutdown_timeout).await;
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribes `bot` to webhook delivery.
    ///
    /// `default_url` is only evaluated when `options` carries no URL.
    pub async fn subscribe<F>(
        &self,
        bot: &BoxedBot,
        default_url: F,
        options: SetWebhookOptions,
    ) -> EngineResult<()>
    where
        F: FnOnce() -> RoutingResult<String>,
    {
        let url = match options.url {
            Some(url) => url,
            None => default_url()?,
        };
        let update_types = options.update_types.unwrap_or_else(|| {
            self.webhook_config
                .resolve_allowed_updates(self.dispatcher.as_ref())
        });
        let secret = options.secret.or_else(|| {
            self.security
                .as_ref()
                .and_then(|security| security.get_secret_token(bot.as_ref()))
        });

        let has_secret = secret.is_some();
        let result = bot
            .call(Subscribe {
                url: url.clone(),
                secret,
                update_types: update_types.clone(),
            })
            .await?;
        if !result.success {
            return Err(ApiError::api(
                "subscribe",
                result.message.unwrap_or_else(|| "subscription rejected".into()),
            )
            .into());
        }

        info!(
            url = %url,
            update_types = ?update_types,
            secret = has_secret,
            "Webhook subscribed"
        );
        Ok(())
    }

    /// Removes the webhook subscription of `bot` for `url`.
    pub async fn unsubscribe(&self, bot: &BoxedBot, url: String) -> EngineResult<()> {
        let result = bot.call(Unsubscribe { url: url.clone() }).await?;
        if !result.success {
            return Err(ApiError::api(
                "unsubscribe",
                result.message.unwrap_or_else(|| "unsubscription rejected".into()),
            )
            .into());
        }

        info!(url = %url, "Webhook unsubscribed");
        Ok(())
    }

    /// Unsubscribes through a bot that is not a tenant, closing it afterwards.
    pub async fn unsubscribe_detached(&self, bot: BoxedBot, url: String) -> EngineResult<()> {
        if !bot.is_started() {
            bot.start().await?;
        }
        let result = self.unsubscribe(&bot, url).await;
        if let Err(e) = bot.close().await {
            warn!(error = %e, "Failed to close detached bot");
        }
        result
    }
}

/// Answer for requests whose tenant cannot be resolved.
pub(crate) fn bot_not_found() -> WebhookResponse {
    WebhookResponse::detail(StatusCode::BAD_REQUEST, "Bot not found")
}

/// Answer for requests whose tenant bot could not be created.
pub(crate) fn bot_unavailable() -> WebhookResponse {
    WebhookResponse::detail(StatusCode::INTERNAL_SERVER_ERROR, "Bot initialization failed")
}

/// Returns whether the content type denotes JSON, ignoring parameters and case.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}
