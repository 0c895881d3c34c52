//! Webhook subscription settings.

use maxo_core::{Dispatcher, UpdateType};

/// Settings applied when subscribing a bot to webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Explicit update types. `None` means "whatever the handlers use".
    pub allowed_updates: Option<Vec<UpdateType>>,
    /// Whether pending updates should be dropped on subscription.
    pub drop_pending_updates: Option<bool>,
}

impl WebhookConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the subscribed update types. An empty list clears the override.
    pub fn with_allowed_updates(mut self, updates: impl IntoIterator<Item = UpdateType>) -> Self {
        let updates: Vec<_> = updates.into_iter().collect();
        self.allowed_updates = (!updates.is_empty()).then_some(updates);
        self
    }

    /// Sets the drop-pending flag.
    pub fn with_drop_pending_updates(mut self, drop: bool) -> Self {
        self.drop_pending_updates = Some(drop);
        self
    }

    /// Returns the update types to subscribe to.
    pub fn resolve_allowed_updates(&self, dispatcher: &dyn Dispatcher) -> Vec<UpdateType> {
        match &self.allowed_updates {
            Some(updates) => updates.clone(),
            None => dispatcher.used_update_types(),
        }
    }
}

/// Per-call overrides for `set_webhook`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetWebhookOptions {
    /// URL to advertise instead of the routing strategy's.
    pub url: Option<String>,
    /// Secret to send instead of the security chain's.
    pub secret: Option<String>,
    /// Update types to subscribe to instead of the config's.
    pub update_types: Option<Vec<UpdateType>>,
}

impl SetWebhookOptions {
    /// Creates options without overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Overrides the secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Overrides the update types.
    pub fn update_types(mut self, update_types: impl IntoIterator<Item = UpdateType>) -> Self {
        self.update_types = Some(update_types.into_iter().collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDispatcher;

    #[test]
    fn test_resolve_falls_back_to_dispatcher() {
        let dispatcher = MockDispatcher::with_types([UpdateType::BotStarted]);
        let config = WebhookConfig::new();
        assert_eq!(
            config.resolve_allowed_updates(&dispatcher),
            vec![UpdateType::BotStarted]
        );
    }

    #[test]
    fn test_resolve_prefers_override() {
        let dispatcher = MockDispatcher::with_types([UpdateType::BotStarted]);
        let config = WebhookConfig::new().with_allowed_updates([UpdateType::MessageCreated]);
        assert_eq!(
            config.resolve_allowed_updates(&dispatcher),
            vec![UpdateType::MessageCreated]
        );
    }

    #[test]
    fn test_empty_override_is_cleared() {
        let config = WebhookConfig::new().with_allowed_updates([]);
        assert_eq!(config.allowed_updates, None);
    }
}
