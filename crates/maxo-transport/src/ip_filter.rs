//! Client IP allow-listing as a tower layer.
//!
//! Unlike [`IpCheck`](maxo_webhook::IpCheck), which runs inside an engine
//! after tenant resolution, this layer guards whole routers:
//!
//! ```rust,ignore
//! let app = adapter
//!     .register(Router::new(), engine)
//!     .layer(ip_filter_layer(IpFilter::new().with_default_networks()));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use maxo_webhook::{IpFilter, client_ip};
use tower::{Layer, Service};
use tracing::warn;

/// Creates a layer rejecting clients outside `filter` with `401`.
pub fn ip_filter_layer(filter: IpFilter) -> IpFilterLayer {
    IpFilterLayer::new(filter)
}

/// Layer wrapping services in [`IpFilterService`].
#[derive(Debug, Clone)]
pub struct IpFilterLayer {
    filter: Arc<IpFilter>,
}

impl IpFilterLayer {
    pub fn new(filter: IpFilter) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }
}

impl<S> Layer<S> for IpFilterLayer {
    type Service = IpFilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpFilterService {
            inner,
            filter: Arc::clone(&self.filter),
        }
    }
}

#[derive(Debug)]
pub struct IpFilterService<S> {
    inner: S,
    filter: Arc<IpFilter>,
}

impl<S> Clone for IpFilterService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        IpFilterService {
            inner: self.inner.clone(),
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<S> Service<Request> for IpFilterService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        match client_ip(request.headers(), peer) {
            Some(ip) if self.filter.contains(ip) => Box::pin(self.inner.call(request)),
            ip => {
                warn!(
                    ip = ?ip,
                    path = %request.uri().path(),
                    "Blocking request from unauthorized IP"
                );
                Box::pin(async { Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response()) })
            }
        }
    }
}
