//! Web framework abstraction.
//!
//! Engines are framework-agnostic: a [`WebAdapter`] binds the native request
//! into a [`BoundRequest`] and renders the engine's [`WebhookResponse`] back
//! into a native response.
//!
//! ```text
//! native request ──bind──▶ BoundRequest ──engine──▶ WebhookResponse ──render──▶ native response
//! ```

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode, header};
use serde_json::{Value, json};

use crate::engine::WebhookEngine;

/// Header carrying the original client address behind a proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// =============================================================================
// BoundRequest
// =============================================================================

/// Adapter-neutral view of one inbound webhook request.
#[derive(Debug, Clone, Default)]
pub struct BoundRequest {
    headers: HeaderMap,
    query_params: HashMap<String, String>,
    path_params: HashMap<String, String>,
    peer_ip: Option<IpAddr>,
    body: Vec<u8>,
}

impl BoundRequest {
    /// Creates a request from its headers and raw body.
    pub fn new(headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
            ..Default::default()
        }
    }

    /// Adds a path parameter.
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Replaces all path parameters.
    pub fn with_path_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.path_params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Replaces all query parameters.
    pub fn with_query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Sets the transport peer address.
    pub fn with_peer_ip(mut self, ip: IpAddr) -> Self {
        self.peer_ip = Some(ip);
        self
    }

    /// Returns all headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Looks up a header by name (case-insensitive). Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Content-Type` header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Returns a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Returns a path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Returns the transport peer address.
    pub fn peer_ip(&self) -> Option<IpAddr> {
        self.peer_ip
    }

    /// Returns the client address: first `X-Forwarded-For` hop, else the peer.
    pub fn client_ip(&self) -> Option<IpAddr> {
        client_ip(&self.headers, self.peer_ip)
    }

    /// Returns the raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Resolves the client address from proxy headers and the peer address.
///
/// A present but unparsable `X-Forwarded-For` yields `None`; the peer
/// address is only used when the header is absent or empty.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty());

    match forwarded {
        Some(value) => value.split(',').next()?.trim().parse().ok(),
        None => peer,
    }
}

// =============================================================================
// WebhookResponse
// =============================================================================

/// Engine decision for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookResponse {
    /// A JSON body.
    Json { status: StatusCode, body: Value },
    /// A plain-text body.
    Text { status: StatusCode, text: String },
}

impl WebhookResponse {
    /// The `200 {}` acknowledgement.
    pub fn ok() -> Self {
        Self::json(StatusCode::OK, json!({}))
    }

    /// Creates a JSON response.
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::Json { status, body }
    }

    /// Creates a plain-text response.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::Text {
            status,
            text: text.into(),
        }
    }

    /// Creates a JSON `{"detail": ...}` response.
    pub fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::json(status, json!({ "detail": detail.into() }))
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Json { status, .. } | Self::Text { status, .. } => *status,
        }
    }

    /// Converts a text response into its `{"detail": text}` JSON form.
    pub fn into_json(self) -> Self {
        match self {
            Self::Text { status, text } => Self::detail(status, text),
            json => json,
        }
    }
}

// =============================================================================
// WebAdapter
// =============================================================================

/// Binding between the engines and a concrete web framework.
#[async_trait]
pub trait WebAdapter: Send + Sync + 'static {
    /// The framework's application type routes are added to.
    type App;
    /// The framework's native request.
    type Request: Send + 'static;
    /// The framework's native response.
    type Response: Send + 'static;

    /// Mounts `engine` as one `POST` route at its routing path.
    fn register<E: WebhookEngine>(&self, app: Self::App, engine: Arc<E>) -> Self::App;

    /// Normalizes a native request.
    ///
    /// Failures to read the request at all (body limits, broken streams) are
    /// answered by the adapter directly.
    async fn bind(&self, request: Self::Request) -> Result<BoundRequest, Self::Response>;

    /// Creates a JSON response.
    fn create_json_response(&self, status: StatusCode, payload: Value) -> Self::Response;

    /// Creates a plain-text response, if the framework supports it.
    fn create_text_response(&self, _status: StatusCode, _text: &str) -> Option<Self::Response> {
        None
    }

    /// Renders an engine decision, falling back to JSON for text bodies.
    fn render(&self, response: WebhookResponse) -> Self::Response {
        match response {
            WebhookResponse::Json { status, body } => self.create_json_response(status, body),
            WebhookResponse::Text { status, text } => self
                .create_text_response(status, &text)
                .unwrap_or_else(|| self.create_json_response(status, json!({ "detail": text }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = BoundRequest::new(headers(&[("x-max-bot-api-secret", "abc")]), "");
        assert_eq!(request.header("X-Max-Bot-Api-Secret"), Some("abc"));
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let request = BoundRequest::new(headers(&[("x-forwarded-for", " 10.0.0.1, 10.0.0.2")]), "")
            .with_peer_ip("127.0.0.1".parse().unwrap());
        assert_eq!(request.client_ip(), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let request = BoundRequest::new(HeaderMap::new(), "").with_peer_ip("::1".parse().unwrap());
        assert_eq!(request.client_ip(), Some("::1".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_garbage_forwarded_is_none() {
        let request = BoundRequest::new(headers(&[("x-forwarded-for", "not-an-ip")]), "")
            .with_peer_ip("127.0.0.1".parse().unwrap());
        assert_eq!(request.client_ip(), None);
    }

    #[test]
    fn test_json_body() {
        let request = BoundRequest::new(HeaderMap::new(), r#"{"a":1}"#);
        assert_eq!(request.json().unwrap(), json!({"a": 1}));
        assert!(BoundRequest::new(HeaderMap::new(), "{").json().is_err());
    }

    #[test]
    fn test_text_response_into_json() {
        let response = WebhookResponse::text(StatusCode::UNAUTHORIZED, "Unauthorized").into_json();
        assert_eq!(
            response,
            WebhookResponse::json(StatusCode::UNAUTHORIZED, json!({"detail": "Unauthorized"}))
        );
    }
}
