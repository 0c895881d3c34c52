//! Startup and shutdown hooks run by the web server around serving.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use maxo_core::{BoxedBot, BoxedDispatcher, Signal};
use tracing::info;

use crate::error::{EngineError, EngineResult};

/// A component with startup and shutdown work.
///
/// Servers run every hook's `on_startup` before accepting requests and every
/// `on_shutdown` after the listener stopped, in reverse registration order.
#[async_trait]
pub trait LifecycleHook: Send + Sync + 'static {
    /// Runs before the server accepts requests.
    async fn on_startup(&self) -> EngineResult<()>;

    /// Runs after the server stopped accepting requests.
    async fn on_shutdown(&self) -> EngineResult<()>;
}

/// A shared LifecycleHook trait object.
pub type BoxedLifecycleHook = Arc<dyn LifecycleHook>;

/// Feeds `signals` in order, stopping at the first failure.
pub(crate) async fn feed_signals(
    dispatcher: &BoxedDispatcher,
    signals: [Signal; 2],
    bot: Option<&BoxedBot>,
) -> EngineResult<()> {
    for signal in signals {
        dispatcher
            .feed_signal(signal, bot.cloned())
            .await
            .map_err(|e| EngineError::signal(signal, e))?;
    }
    Ok(())
}

/// Lifecycle signals for a dispatcher that is not bound to any engine.
///
/// Useful when several dispatchers share one application: each gets its
/// startup and shutdown signals exactly once, without a bot.
pub struct DispatcherLifecycle {
    dispatcher: BoxedDispatcher,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl DispatcherLifecycle {
    /// Creates hooks for `dispatcher`.
    pub fn new(dispatcher: BoxedDispatcher) -> Self {
        Self {
            dispatcher,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LifecycleHook for DispatcherLifecycle {
    async fn on_startup(&self) -> EngineResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        feed_signals(&self.dispatcher, Signal::STARTUP, None).await?;
        info!("Dispatcher started");
        Ok(())
    }

    async fn on_shutdown(&self) -> EngineResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        feed_signals(&self.dispatcher, Signal::SHUTDOWN, None).await?;
        info!("Dispatcher stopped");
        Ok(())
    }
}
