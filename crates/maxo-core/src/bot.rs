//! Bot trait and related types.
//!
//! This module defines the `Bot` trait which represents one authenticated
//! identity on the platform. The webhook engines never talk HTTP to the
//! platform themselves; every outbound request goes through [`Bot::call_method`].

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::methods::{BotMethod, MethodCall};

/// The core Bot trait.
///
/// A Bot is an outbound API client bound to a single token:
/// - `start` prepares the client (sessions, identity lookup)
/// - `call_method` performs one raw API call
/// - `close` releases the underlying connection pool
///
/// Concrete implementations (an HTTP client, a test double) live outside
/// this crate. Strongly-typed calls are layered on top through [`BotExt`].
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the access token this bot authenticates with.
    fn token(&self) -> &str;

    /// Returns the platform-assigned numeric id, once known.
    ///
    /// Implementations usually learn it during [`Bot::start`].
    fn bot_id(&self) -> Option<i64>;

    /// Returns whether [`Bot::start`] has completed successfully.
    fn is_started(&self) -> bool;

    /// Starts the bot. Calling it on a started bot must be harmless.
    async fn start(&self) -> ApiResult<()>;

    /// Closes the outbound connection.
    async fn close(&self) -> ApiResult<()>;

    /// Performs a raw API call and returns the decoded JSON response.
    async fn call_method(&self, call: MethodCall) -> ApiResult<Value>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Typed calls on top of [`Bot::call_method`].
#[async_trait]
pub trait BotExt: Bot {
    /// Sends a typed method and decodes its typed response.
    async fn call<M>(&self, method: M) -> ApiResult<M::Response>
    where
        M: BotMethod + 'async_trait,
    {
        let raw = self.call_method(method.into_call()?).await?;
        Ok(serde_json::from_value(raw)?)
    }
}

impl<B: Bot + ?Sized> BotExt for B {}

/// Builds bot instances for tokens seen at runtime.
///
/// Multi-tenant engines call this the first time a token (or a registered
/// id) shows up, so construction settings are captured by the factory.
pub trait BotFactory: Send + Sync + 'static {
    /// Creates a new, not yet started, bot for `token`.
    fn create(&self, token: &str) -> BoxedBot;
}

impl<F> BotFactory for F
where
    F: Fn(&str) -> BoxedBot + Send + Sync + 'static,
{
    fn create(&self, token: &str) -> BoxedBot {
        self(token)
    }
}

/// Attempts to downcast a BoxedBot to a specific concrete type.
///
/// ```rust,ignore
/// if let Some(client) = downcast_bot::<HttpBot>(bot) {
///     client.base_url();
/// }
/// ```
pub fn downcast_bot<T: Bot>(bot: BoxedBot) -> Option<Arc<T>> {
    Arc::downcast::<T>(bot.as_any()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::{HttpMethod, SimpleQueryResult, Unsubscribe};
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingBot {
        token: String,
        calls: Mutex<Vec<MethodCall>>,
    }

    #[async_trait]
    impl Bot for RecordingBot {
        fn token(&self) -> &str {
            &self.token
        }

        fn bot_id(&self) -> Option<i64> {
            None
        }

        fn is_started(&self) -> bool {
            true
        }

        async fn start(&self) -> ApiResult<()> {
            Ok(())
        }

        async fn close(&self) -> ApiResult<()> {
            Ok(())
        }

        async fn call_method(&self, call: MethodCall) -> ApiResult<Value> {
            self.calls.lock().unwrap().push(call);
            Ok(json!({"success": true}))
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn recording_bot(token: &str) -> BoxedBot {
        Arc::new(RecordingBot {
            token: token.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_call_decodes_typed_response() {
        let bot = recording_bot("tok");
        let result = bot
            .call(Unsubscribe {
                url: "https://example.com/hook".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            result,
            SimpleQueryResult {
                success: true,
                message: None
            }
        );

        let bot = downcast_bot::<RecordingBot>(bot).unwrap();
        let calls = bot.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].http_method, HttpMethod::Delete);
        assert_eq!(
            calls[0].query,
            vec![("url".to_string(), "https://example.com/hook".to_string())]
        );
    }

    #[test]
    fn test_closure_factory() {
        let factory = |token: &str| recording_bot(token);
        let bot = BotFactory::create(&factory, "abc");
        assert_eq!(bot.token(), "abc");
    }
}
