//! axum binding for webhook engines.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{ConnectInfo, FromRequestParts, RawPathParams, Request},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use maxo_webhook::{BoundRequest, BoxedLifecycleHook, WebAdapter, WebhookEngine, WebhookResponse};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Default request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// [`WebAdapter`] for [`axum::Router`].
///
/// Every registered engine's [`LifecycleHook`](maxo_webhook::LifecycleHook)
/// is recorded so a [`WebhookServer`](crate::WebhookServer) can run them
/// around serving. Clones share the recorded hooks.
#[derive(Clone)]
pub struct AxumAdapter {
    max_body_bytes: usize,
    text_responses: bool,
    hooks: Arc<Mutex<Vec<BoxedLifecycleHook>>>,
}

impl AxumAdapter {
    /// Creates an adapter with the default body limit.
    pub fn new() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            text_responses: true,
            hooks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the maximum accepted body size.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Enables or disables plain-text responses.
    ///
    /// When disabled, text bodies are sent as `{"detail": text}`.
    pub fn with_text_responses(mut self, enabled: bool) -> Self {
        self.text_responses = enabled;
        self
    }

    /// Returns the body limit.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Records an extra lifecycle hook, e.g. a
    /// [`DispatcherLifecycle`](maxo_webhook::DispatcherLifecycle).
    pub fn add_hook(&self, hook: BoxedLifecycleHook) {
        self.hooks.lock().push(hook);
    }

    /// Returns the recorded hooks in registration order.
    pub fn hooks(&self) -> Vec<BoxedLifecycleHook> {
        self.hooks.lock().clone()
    }

    fn reject(&self, status: StatusCode, reason: &str) -> Response {
        self.render(WebhookResponse::text(status, reason))
    }
}

impl Default for AxumAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebAdapter for AxumAdapter {
    type App = Router;
    type Request = Request;
    type Response = Response;

    fn register<E: WebhookEngine>(&self, app: Router, engine: Arc<E>) -> Router {
        let path = engine.path().to_string();
        self.add_hook(engine.clone());

        let adapter = self.clone();
        let handler = move |request: Request| {
            let adapter = adapter.clone();
            let engine = Arc::clone(&engine);
            async move {
                match adapter.bind(request).await {
                    Ok(bound) => adapter.render(engine.handle_request(bound).await),
                    Err(response) => response,
                }
            }
        };

        info!(path = %path, "Registered webhook route");
        app.route(&path, post(handler))
    }

    async fn bind(&self, request: Request) -> Result<BoundRequest, Response> {
        let (mut parts, body) = request.into_parts();

        let declared_len = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if let Some(length) = declared_len.filter(|len| *len > self.max_body_bytes) {
            warn!(length, limit = self.max_body_bytes, "Webhook body exceeds limit");
            return Err(self.reject(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
        }

        let path_params: Vec<(String, String)> =
            match RawPathParams::from_request_parts(&mut parts, &()).await {
                Ok(params) => params
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                Err(_) => Vec::new(),
            };

        let query_params: Vec<(String, String)> = parts
            .uri
            .query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        let peer_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "Failed to read webhook body");
                return Err(self.reject(StatusCode::BAD_REQUEST, "Failed to read request body"));
            }
        };

        let mut bound = BoundRequest::new(parts.headers, body.to_vec())
            .with_path_params(path_params)
            .with_query_params(query_params);
        if let Some(ip) = peer_ip {
            bound = bound.with_peer_ip(ip);
        }
        Ok(bound)
    }

    fn create_json_response(&self, status: StatusCode, payload: Value) -> Response {
        (status, Json(payload)).into_response()
    }

    fn create_text_response(&self, status: StatusCode, text: &str) -> Option<Response> {
        self.text_responses
            .then(|| (status, text.to_string()).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    #[tokio::test]
    async fn test_bind_collects_query_and_peer() {
        let adapter = AxumAdapter::new();
        let mut request = http::Request::builder()
            .method("POST")
            .uri("/hook?bot=42&x=a%20b")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 5000))));

        let bound = adapter.bind(request).await.unwrap();
        assert_eq!(bound.query_param("bot"), Some("42"));
        assert_eq!(bound.query_param("x"), Some("a b"));
        assert_eq!(bound.peer_ip(), Some("10.1.2.3".parse().unwrap()));
        assert_eq!(bound.content_type(), Some("application/json"));
        assert_eq!(bound.body(), b"{}");
    }

    #[tokio::test]
    async fn test_bind_rejects_oversized_body() {
        let adapter = AxumAdapter::new().with_max_body_bytes(4);
        let request = http::Request::builder()
            .method("POST")
            .uri("/hook")
            .body(Body::from("0123456789"))
            .unwrap();

        let response = adapter.bind(request).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bind_rejects_declared_oversized_body() {
        let adapter = AxumAdapter::new().with_max_body_bytes(4);
        let request = http::Request::builder()
            .method("POST")
            .uri("/hook")
            .header("content-length", "10")
            .body(Body::from("0123456789"))
            .unwrap();

        let response = adapter.bind(request).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_text_responses_can_be_disabled() {
        let adapter = AxumAdapter::new().with_text_responses(false);
        assert!(
            adapter
                .create_text_response(StatusCode::UNAUTHORIZED, "Unauthorized")
                .is_none()
        );

        let adapter = AxumAdapter::new();
        let response = adapter
            .create_text_response(StatusCode::UNAUTHORIZED, "Unauthorized")
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
