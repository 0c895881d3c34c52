//! Runtime orchestration: configuration, logging and a lifecycle-aware server.
//!
//! ```rust,ignore
//! use maxo_runtime::{ConfigureEngine, WebhookRuntime};
//!
//! let mut runtime = WebhookRuntime::builder()
//!     .config_file("maxo.toml")
//!     .build()?;
//!
//! let settings = runtime.settings().clone();
//! let engine = TokenEngine::new(dispatcher, factory, PathRouting::new(settings.url()?)?)
//!     .configure(&settings)?;
//! runtime.register(engine);
//!
//! // Serves until Ctrl+C or SIGTERM.
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use maxo_core::BoxedDispatcher;
use maxo_transport::{AxumAdapter, WebhookServer};
use maxo_webhook::{
    BotIdEngine, DispatcherLifecycle, SimpleEngine, TokenEngine, WebAdapter, WebhookEngine,
};
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, MaxoConfig, WebhookSettings};
use crate::error::RuntimeResult;
use crate::logging;

/// Hosts webhook engines on one HTTP server.
pub struct WebhookRuntime {
    config: MaxoConfig,
    adapter: AxumAdapter,
    router: Router,
    routes: usize,
}

impl WebhookRuntime {
    /// Creates a runtime from the configuration in the current directory.
    ///
    /// Falls back to defaults if no valid configuration is found.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                MaxoConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging.
    pub fn from_config(config: &MaxoConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            listen_addr = %config.webhook.listen_addr,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            adapter: config.webhook.adapter(),
            router: Router::new(),
            routes: 0,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MaxoConfig {
        &self.config
    }

    /// Returns the webhook section of the configuration.
    pub fn settings(&self) -> &WebhookSettings {
        &self.config.webhook
    }

    /// Returns the adapter engines are mounted with.
    pub fn adapter(&self) -> &AxumAdapter {
        &self.adapter
    }

    /// Returns the number of mounted engines.
    pub fn route_count(&self) -> usize {
        self.routes
    }

    /// Mounts `engine` and returns a handle for `set_webhook` calls.
    pub fn register<E: WebhookEngine>(&mut self, engine: E) -> Arc<E> {
        let engine = Arc::new(engine);
        let router = std::mem::take(&mut self.router);
        self.router = self.adapter.register(router, Arc::clone(&engine));
        self.routes += 1;
        engine
    }

    /// Fires startup and shutdown signals for a dispatcher not owned by an engine.
    pub fn add_dispatcher(&self, dispatcher: BoxedDispatcher) {
        self.adapter.add_hook(Arc::new(DispatcherLifecycle::new(dispatcher)));
    }

    /// Merges extra routes, e.g. health checks, into the served router.
    pub fn merge(&mut self, router: Router) {
        let current = std::mem::take(&mut self.router);
        self.router = current.merge(router);
    }

    /// Converts into a server without binding.
    pub fn into_server(self) -> WebhookServer {
        WebhookServer::new(self.router, &self.adapter)
    }

    /// Serves until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.routes == 0 {
            warn!("No webhook engines registered");
        }

        let addr = self.config.webhook.listen_addr.clone();
        info!(addr = %addr, routes = self.routes, "Starting webhook runtime");

        self.into_server().serve(&addr, shutdown).await?;

        info!("Webhook runtime stopped");
        Ok(())
    }
}

impl Default for WebhookRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// ConfigureEngine
// =============================================================================

/// Applies [`WebhookSettings`] to an engine.
pub trait ConfigureEngine: Sized {
    /// Sets security, subscription settings, background handling and the
    /// shutdown timeout from `settings`.
    fn configure(self, settings: &WebhookSettings) -> ConfigResult<Self>;
}

macro_rules! impl_configure_engine {
    ($($engine:ty),* $(,)?) => {
        $(
            impl ConfigureEngine for $engine {
                fn configure(self, settings: &WebhookSettings) -> ConfigResult<Self> {
                    Ok(self
                        .with_security(settings.security()?)
                        .with_webhook_config(settings.webhook_config())
                        .with_handle_in_background(settings.handle_in_background)
                        .with_shutdown_timeout(settings.shutdown_timeout()))
                }
            }
        )*
    };
}

impl_configure_engine!(SimpleEngine, TokenEngine, BotIdEngine);

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`WebhookRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically.
    pub fn merge(mut self, config: MaxoConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<WebhookRuntime> {
        let config = self.config_loader.load()?;
        Ok(WebhookRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
