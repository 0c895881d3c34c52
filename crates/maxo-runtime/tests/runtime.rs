//! Runtime wiring: settings applied to engines and lifecycle around serving.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use maxo_core::Signal;
use maxo_runtime::{ConfigureEngine, MaxoConfig, WebhookRuntime, WebhookSettings};
use maxo_webhook::testing::{MockBot, MockDispatcher};
use maxo_webhook::{BoundRequest, SimpleEngine, StaticRouting, WebhookEngine};

fn settings() -> WebhookSettings {
    WebhookSettings {
        listen_addr: "127.0.0.1:0".into(),
        url: Some("https://example.com/webhook".into()),
        secret: Some("s3cret".into()),
        handle_in_background: false,
        ..Default::default()
    }
}

fn engine(dispatcher: Arc<MockDispatcher>, settings: &WebhookSettings) -> SimpleEngine {
    SimpleEngine::new(
        dispatcher,
        Arc::new(MockBot::new("tok")),
        StaticRouting::new(settings.url().unwrap()).unwrap(),
    )
    .configure(settings)
    .unwrap()
}

#[tokio::test]
async fn test_configured_engine_requires_secret() {
    let settings = settings();
    let engine = engine(Arc::new(MockDispatcher::new()), &settings);

    assert_eq!(engine.path(), "/webhook");
    assert!(engine.core().security().is_some());

    let mut headers = HeaderMap::new();
    headers.insert("content-type", "application/json".parse().unwrap());
    let response = engine.handle_request(BoundRequest::new(headers, "{}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_run_until_drives_lifecycle() {
    let settings = settings();
    let config = MaxoConfig {
        webhook: settings.clone(),
        ..Default::default()
    };

    let dispatcher = Arc::new(MockDispatcher::new());
    let shared = Arc::new(MockDispatcher::new());

    let mut runtime = WebhookRuntime::from_config(&config);
    runtime.register(engine(dispatcher.clone(), &settings));
    runtime.add_dispatcher(shared.clone());
    assert_eq!(runtime.route_count(), 1);

    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    let expected = [
        Signal::BeforeStartup,
        Signal::AfterStartup,
        Signal::BeforeShutdown,
        Signal::AfterShutdown,
    ];
    assert_eq!(dispatcher.signals_for("tok"), expected);
    assert_eq!(shared.signals(), expected);
}
