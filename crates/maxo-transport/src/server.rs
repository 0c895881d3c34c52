//! Lifecycle-aware HTTP server.
//!
//! ```text
//! on_startup (registration order)
//!     │
//! axum::serve ── until the shutdown future resolves, then drains connections
//!     │
//! on_shutdown (reverse order)
//! ```

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use maxo_webhook::BoxedLifecycleHook;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::adapter::AxumAdapter;
use crate::error::{TransportError, TransportResult};

/// Serves a router and runs its engines' lifecycle hooks around it.
pub struct WebhookServer {
    router: Router,
    hooks: Vec<BoxedLifecycleHook>,
}

impl WebhookServer {
    /// Creates a server for `router`, taking the hooks `adapter` recorded.
    pub fn new(router: Router, adapter: &AxumAdapter) -> Self {
        Self::from_parts(router, adapter.hooks())
    }

    /// Creates a server from a router and an explicit hook list.
    pub fn from_parts(router: Router, hooks: Vec<BoxedLifecycleHook>) -> Self {
        Self { router, hooks }
    }

    /// Appends a hook.
    pub fn with_hook(mut self, hook: BoxedLifecycleHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Returns the hooks in startup order.
    pub fn hooks(&self) -> &[BoxedLifecycleHook] {
        &self.hooks
    }

    /// Returns the served router.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs every hook's `on_startup` in order.
    ///
    /// If one fails, the hooks already started are shut down again.
    pub async fn startup(&self) -> TransportResult<()> {
        for (index, hook) in self.hooks.iter().enumerate() {
            if let Err(e) = hook.on_startup().await {
                error!(error = %e, hook = index, "Webhook startup hook failed");
                if let Err(rollback) = shutdown_hooks(&self.hooks[..index]).await {
                    error!(error = %rollback, "Rollback after failed startup incomplete");
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Runs every hook's `on_shutdown` in reverse order.
    ///
    /// All hooks run even if one fails; the first error is returned.
    pub async fn shutdown(&self) -> TransportResult<()> {
        shutdown_hooks(&self.hooks).await
    }

    /// Binds `addr` and serves until `signal` resolves.
    pub async fn serve<F>(self, addr: &str, signal: F) -> TransportResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        self.serve_listener(listener, signal).await
    }

    /// Serves on an already bound listener until `signal` resolves.
    pub async fn serve_listener<F>(self, listener: TcpListener, signal: F) -> TransportResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.startup().await?;

        info!(addr = %addr, hooks = self.hooks.len(), "Webhook server listening");

        let served = axum::serve(
            listener,
            self.router
                .clone()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await;

        info!(addr = %addr, "Webhook server shutting down");
        if let Err(e) = &served {
            error!(error = %e, "Webhook server error");
        }

        let shutdown = self.shutdown().await;
        served?;
        shutdown
    }
}

async fn shutdown_hooks(hooks: &[BoxedLifecycleHook]) -> TransportResult<()> {
    let mut first_error = None;
    for hook in hooks.iter().rev() {
        if let Err(e) = hook.on_shutdown().await {
            error!(error = %e, "Webhook shutdown hook failed");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
