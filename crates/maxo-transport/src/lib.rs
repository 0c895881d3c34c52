//! # Maxo Transport
//!
//! HTTP serving for `maxo-webhook` engines, built on axum.
//!
//! ## Features
//!
//! - `http-server` (default): [`AxumAdapter`], [`ip_filter_layer`] and
//!   [`WebhookServer`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::Router;
//! use maxo_transport::{AxumAdapter, WebhookServer};
//! use maxo_webhook::WebAdapter;
//!
//! let adapter = AxumAdapter::new();
//! let app = adapter.register(Router::new(), Arc::new(engine));
//!
//! WebhookServer::new(app, &adapter)
//!     .serve("0.0.0.0:8080", async { tokio::signal::ctrl_c().await.ok(); })
//!     .await?;
//! ```

pub mod error;

#[cfg(feature = "http-server")]
mod adapter;
#[cfg(feature = "http-server")]
mod ip_filter;
#[cfg(feature = "http-server")]
mod server;

pub use error::{TransportError, TransportResult};

#[cfg(feature = "http-server")]
pub use adapter::{AxumAdapter, DEFAULT_MAX_BODY_BYTES};
#[cfg(feature = "http-server")]
pub use ip_filter::{IpFilterLayer, IpFilterService, ip_filter_layer};
#[cfg(feature = "http-server")]
pub use server::WebhookServer;
