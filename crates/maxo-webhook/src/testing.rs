//! Test doubles for engines and transports.
//!
//! Compiled for this crate's tests and for dependents enabling the `testing`
//! feature.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use maxo_core::{
    ApiResult, Bot, BotFactory, BoxedBot, Dispatcher, MethodCall, Signal, Update, UpdateEnvelope,
    UpdateType,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::adapter::BoundRequest;
use crate::security::SECRET_HEADER;

/// Secret the request helpers send.
pub const SECRET: &str = "test-secret";

/// A `message_created` update carrying `text`.
pub fn message_created(text: &str) -> Value {
    json!({
        "update_type": "message_created",
        "timestamp": 1_700_000_000_000_i64,
        "message": {
            "sender": {"user_id": 1, "first_name": "Alice", "is_bot": false},
            "recipient": {"chat_id": 100, "chat_type": "dialog", "user_id": 1},
            "timestamp": 1_700_000_000_000_i64,
            "body": {"mid": "mid.1", "seq": 1, "text": text},
        },
    })
}

/// A JSON request carrying [`SECRET`].
pub fn json_request(body: impl Into<Vec<u8>>) -> BoundRequest {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert(SECRET_HEADER, HeaderValue::from_static(SECRET));
    BoundRequest::new(headers, body)
}

pub fn update_request(update: &Value) -> BoundRequest {
    json_request(serde_json::to_vec(update).unwrap_or_default())
}

// =============================================================================
// MockBot
// =============================================================================

/// Bot recording its lifecycle and every outbound call.
pub struct MockBot {
    token: String,
    bot_id: Option<i64>,
    started: AtomicBool,
    pub start_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub calls: Mutex<Vec<MethodCall>>,
}

impl MockBot {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            bot_id: None,
            started: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_id(mut self, bot_id: i64) -> Self {
        self.bot_id = Some(bot_id);
        self
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bot for MockBot {
    fn token(&self) -> &str {
        &self.token
    }

    fn bot_id(&self) -> Option<i64> {
        self.bot_id
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    async fn start(&self) -> ApiResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> ApiResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn call_method(&self, call: MethodCall) -> ApiResult<Value> {
        self.calls.lock().push(call);
        Ok(json!({"success": true}))
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Factory counting how many bots it built.
#[derive(Clone, Default)]
pub struct CountingFactory {
    pub created: Arc<AtomicUsize>,
    pub bots: Arc<Mutex<Vec<Arc<MockBot>>>>,
}

impl CountingFactory {
    pub fn count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl BotFactory for CountingFactory {
    fn create(&self, token: &str) -> BoxedBot {
        self.created.fetch_add(1, Ordering::SeqCst);
        let bot = Arc::new(MockBot::new(token));
        self.bots.lock().push(Arc::clone(&bot));
        bot
    }
}

// =============================================================================
// MockDispatcher
// =============================================================================

/// Dispatcher recording fed updates and signals with the bot token.
#[derive(Default)]
pub struct MockDispatcher {
    pub fail_feed: bool,
    pub fail_signals: bool,
    pub feed_delay: Option<Duration>,
    pub used_types: Vec<UpdateType>,
    pub updates: Mutex<Vec<(Update, String)>>,
    pub signals: Mutex<Vec<(Signal, Option<String>)>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(types: impl IntoIterator<Item = UpdateType>) -> Self {
        Self {
            used_types: types.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn failing_signals() -> Self {
        Self {
            fail_signals: true,
            ..Default::default()
        }
    }

    pub fn feed_count(&self) -> usize {
        self.updates.lock().len()
    }

    /// Tokens of the bots updates were fed with, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.updates
            .lock()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    /// Every fed signal, in order.
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().iter().map(|(signal, _)| *signal).collect()
    }

    /// Signals fed for the bot with `token`.
    pub fn signals_for(&self, token: &str) -> Vec<Signal> {
        self.signals
            .lock()
            .iter()
            .filter(|(_, bot)| bot.as_deref() == Some(token))
            .map(|(signal, _)| *signal)
            .collect()
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    async fn feed(&self, envelope: UpdateEnvelope, bot: BoxedBot) -> anyhow::Result<()> {
        if let Some(delay) = self.feed_delay {
            tokio::time::sleep(delay).await;
        }
        self.updates
            .lock()
            .push((envelope.into_update(), bot.token().to_string()));
        if self.fail_feed {
            anyhow::bail!("handler failed");
        }
        Ok(())
    }

    async fn feed_signal(&self, signal: Signal, bot: Option<BoxedBot>) -> anyhow::Result<()> {
        if self.fail_signals {
            anyhow::bail!("signal handler failed");
        }
        self.signals
            .lock()
            .push((signal, bot.map(|b| b.token().to_string())));
        Ok(())
    }

    fn used_update_types(&self) -> Vec<UpdateType> {
        self.used_types.clone()
    }
}
