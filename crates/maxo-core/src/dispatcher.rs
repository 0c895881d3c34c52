//! Dispatcher contract consumed by the webhook engines.
//!
//! The handler tree (filters, routers, middlewares) lives behind the
//! [`Dispatcher`] trait. Engines only ever:
//!
//! 1. feed lifecycle [`Signal`]s around startup and shutdown
//! 2. feed one [`UpdateEnvelope`] per accepted webhook push
//! 3. ask which update types the registered handlers care about

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::BoxedBot;
use crate::update::{Update, UpdateType};

// =============================================================================
// Signals
// =============================================================================

/// Lifecycle signals fed to a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    BeforeStartup,
    AfterStartup,
    BeforeShutdown,
    AfterShutdown,
}

impl Signal {
    /// Startup signals, in firing order.
    pub const STARTUP: [Signal; 2] = [Signal::BeforeStartup, Signal::AfterStartup];

    /// Shutdown signals, in firing order.
    pub const SHUTDOWN: [Signal; 2] = [Signal::BeforeShutdown, Signal::AfterShutdown];

    /// Returns the signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeStartup => "before_startup",
            Self::AfterStartup => "after_startup",
            Self::BeforeShutdown => "before_shutdown",
            Self::AfterShutdown => "after_shutdown",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// UpdateEnvelope
// =============================================================================

/// One update handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEnvelope {
    update: Update,
}

impl UpdateEnvelope {
    /// Wraps an update.
    pub fn new(update: Update) -> Self {
        Self { update }
    }

    /// Returns the wrapped update.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns the kind of the wrapped update.
    pub fn update_type(&self) -> UpdateType {
        self.update.update_type()
    }

    /// Unwraps the update.
    pub fn into_update(self) -> Update {
        self.update
    }
}

impl From<Update> for UpdateEnvelope {
    fn from(update: Update) -> Self {
        Self::new(update)
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// The handler pipeline an engine feeds updates into.
///
/// Implementations must be safe to call concurrently: engines feed updates
/// from independent requests without ordering guarantees.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Processes one update on behalf of `bot`.
    async fn feed(&self, envelope: UpdateEnvelope, bot: BoxedBot) -> anyhow::Result<()>;

    /// Processes a lifecycle signal.
    ///
    /// `bot` is `None` when the signal is not tied to a particular tenant.
    async fn feed_signal(&self, signal: Signal, bot: Option<BoxedBot>) -> anyhow::Result<()>;

    /// Returns the update types referenced by the registered handlers.
    fn used_update_types(&self) -> Vec<UpdateType>;
}

/// A shared Dispatcher trait object.
pub type BoxedDispatcher = Arc<dyn Dispatcher>;
