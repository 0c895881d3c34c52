//! Engines mounted on an axum router.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use maxo_core::{Signal, UpdateType};
use maxo_transport::{AxumAdapter, WebhookServer, ip_filter_layer};
use maxo_webhook::testing::{CountingFactory, MockBot, MockDispatcher, SECRET, message_created};
use maxo_webhook::{
    DispatcherLifecycle, IpFilter, PathBotIdRouting, PathRouting, SECRET_HEADER, Security,
    SimpleEngine, StaticRouting, StaticSecretToken, TokenEngine, WebAdapter,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

/// Builds a secured JSON webhook POST to `uri`.
fn webhook_request(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn secured() -> Security {
    Security::default().with_secret_token(StaticSecretToken::new(SECRET))
}

fn simple_app(adapter: &AxumAdapter, dispatcher: Arc<MockDispatcher>) -> Router {
    let engine = SimpleEngine::new(
        dispatcher,
        Arc::new(MockBot::new("tok")),
        StaticRouting::new("https://example.com/webhook").unwrap(),
    )
    .with_security(secured())
    .with_handle_in_background(false);
    adapter.register(Router::new(), Arc::new(engine))
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn with_peer(mut request: Request<Body>, peer: impl Into<std::net::IpAddr>) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer.into(), 40000))));
    request
}

// =============================================================================
// Routing through axum
// =============================================================================

#[tokio::test]
async fn test_simple_engine_acknowledges_update() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let app = simple_app(&AxumAdapter::new(), dispatcher.clone());

    let response = app
        .oneshot(webhook_request("/webhook", &message_created("hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({}));
    assert_eq!(dispatcher.tokens(), ["tok"]);
    assert_eq!(
        dispatcher.updates.lock()[0].0.update_type(),
        UpdateType::MessageCreated
    );
}

#[tokio::test]
async fn test_unauthorized_is_plain_text() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let app = simple_app(&AxumAdapter::new(), dispatcher.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(message_created("hi").to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_text(response).await, "Unauthorized");
    assert!(dispatcher.feed_count() == 0);
}

#[tokio::test]
async fn test_text_falls_back_to_json_detail() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let adapter = AxumAdapter::new().with_text_responses(false);
    let app = simple_app(&adapter, dispatcher);

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "text/plain")
        .header("x-max-bot-api-secret", SECRET)
        .body(Body::from("hello"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Invalid Content-Type, expected JSON"})
    );
}

#[tokio::test]
async fn test_get_is_not_routed() {
    let app = simple_app(&AxumAdapter::new(), Arc::new(MockDispatcher::new()));

    let request = Request::builder()
        .method("GET")
        .uri("/webhook")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_token_from_path_selects_bot() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let engine = TokenEngine::new(
        dispatcher.clone(),
        CountingFactory::default(),
        PathRouting::new("https://example.com/webhook/bot/{bot_token}").unwrap(),
    )
    .with_security(secured())
    .with_handle_in_background(false);
    let engine = Arc::new(engine);
    let app = AxumAdapter::new().register(Router::new(), engine.clone());

    for token in ["alpha", "beta", "alpha"] {
        let uri = format!("/webhook/bot/{token}");
        let response = app
            .clone()
            .oneshot(webhook_request(&uri, &message_created("hi")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(dispatcher.tokens(), ["alpha", "beta", "alpha"]);
    assert_eq!(engine.bot_count(), 2);
}

#[tokio::test]
async fn test_unknown_bot_id_is_bot_not_found() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let engine = maxo_webhook::BotIdEngine::new(
        dispatcher.clone(),
        CountingFactory::default(),
        PathBotIdRouting::new("https://example.com/hook/{bot_id}").unwrap(),
    )
    .with_security(secured())
    .with_handle_in_background(false);
    engine.register_bot(7, "seven");
    let app = AxumAdapter::new().register(Router::new(), Arc::new(engine));

    let response = app
        .clone()
        .oneshot(webhook_request("/hook/8", &message_created("hi")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"detail": "Bot not found"}));

    let response = app
        .oneshot(webhook_request("/hook/7", &message_created("hi")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatcher.tokens(), ["seven"]);
}

// =============================================================================
// IP filter
// =============================================================================

fn filtered_app(dispatcher: Arc<MockDispatcher>) -> Router {
    let filter = IpFilter::parse(["10.0.0.0/8"]).unwrap();
    simple_app(&AxumAdapter::new(), dispatcher).layer(ip_filter_layer(filter))
}

#[tokio::test]
async fn test_ip_filter_allows_listed_peer() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let request = with_peer(
        webhook_request("/webhook", &message_created("hi")),
        [10, 2, 3, 4],
    );

    let response = filtered_app(dispatcher.clone())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatcher.feed_count(), 1);
}

#[tokio::test]
async fn test_ip_filter_blocks_unlisted_peer() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let request = with_peer(
        webhook_request("/webhook", &message_created("hi")),
        [192, 168, 1, 1],
    );

    let response = filtered_app(dispatcher.clone())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(dispatcher.feed_count() == 0);
}

#[tokio::test]
async fn test_ip_filter_matches_ipv4_mapped_peer() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let request = with_peer(
        webhook_request("/webhook", &message_created("hi")),
        Ipv4Addr::new(10, 2, 3, 4).to_ipv6_mapped(),
    );

    let response = filtered_app(dispatcher.clone())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatcher.feed_count(), 1);
}

#[tokio::test]
async fn test_ip_filter_uses_first_forwarded_hop() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let mut request = webhook_request("/webhook", &message_created("hi"));
    request.headers_mut().insert(
        "x-forwarded-for",
        "10.9.9.9, 192.168.1.1".parse().unwrap(),
    );
    let request = with_peer(request, [127, 0, 0, 1]);

    let response = filtered_app(dispatcher).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ip_filter_without_address_is_blocked() {
    let response = filtered_app(Arc::new(MockDispatcher::new()))
        .oneshot(webhook_request("/webhook", &message_created("hi")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// WebhookServer
// =============================================================================

#[tokio::test]
async fn test_server_runs_lifecycle_around_serving() {
    let dispatcher = Arc::new(MockDispatcher::new());
    let shared = Arc::new(MockDispatcher::new());
    let adapter = AxumAdapter::new();
    let app = simple_app(&adapter, dispatcher.clone());
    adapter.add_hook(Arc::new(DispatcherLifecycle::new(shared.clone())));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = WebhookServer::new(app, &adapter);
    assert_eq!(server.hooks().len(), 2);
    let handle = tokio::spawn(server.serve_listener(listener, async {
        let _ = stop_rx.await;
    }));

    let body = message_created("over the wire").to_string();
    let raw = format!(
        "POST /webhook HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\n\
         x-max-bot-api-secret: {SECRET}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();
    assert!(reply.starts_with("HTTP/1.1 200"), "unexpected reply: {reply}");

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(dispatcher.feed_count(), 1);
    assert_eq!(
        dispatcher.signals(),
        [
            Signal::BeforeStartup,
            Signal::AfterStartup,
            Signal::BeforeShutdown,
            Signal::AfterShutdown
        ]
    );
    assert_eq!(
        shared.signals(),
        [
            Signal::BeforeStartup,
            Signal::AfterStartup,
            Signal::BeforeShutdown,
            Signal::AfterShutdown
        ]
    );
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let server = WebhookServer::from_parts(Router::new(), Vec::new());
    let err = server.serve(&addr, async {}).await.unwrap_err();

    assert!(matches!(err, maxo_transport::TransportError::Bind { .. }));
}
