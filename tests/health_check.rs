mod common;

use common::TestApp;
use landmark_service::services::init_metrics;
use landmark_service::services::providers::mock::MockDetector;
use reqwest::Client;
use std::sync::{Arc, Once};
use wiremock::MockServer;

// Initialize metrics once for all tests
static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        init_metrics();
    });
}

#[tokio::test]
async fn health_check_works() {
    let wiki = MockServer::start().await;
    let app = TestApp::spawn(Arc::new(MockDetector::empty()), &wiki.uri()).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "landmark-service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_check_works() {
    let wiki = MockServer::start().await;
    let app = TestApp::spawn(Arc::new(MockDetector::empty()), &wiki.uri()).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_format() {
    ensure_metrics_initialized();
    let wiki = MockServer::start().await;
    let app = TestApp::spawn(Arc::new(MockDetector::empty()), &wiki.uri()).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let content_type = response
        .headers()
        .get("content-type")
        .expect("Missing content-type header")
        .to_str()
        .expect("Invalid content-type");

    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.expect("Failed to get response body");
    // The body might be empty if nothing was recorded yet, which is fine;
    // anything else should look like Prometheus exposition format.
    assert!(
        body.is_empty() || body.contains('#') || body.contains('_'),
        "Unexpected metrics format: {}",
        body
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let wiki = MockServer::start().await;
    let app = TestApp::spawn(Arc::new(MockDetector::empty()), &wiki.uri()).await;
    let client = Client::new();

    // A provided id is echoed back.
    let response = client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "test-trace-42")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-trace-42"
    );

    // Without one, the service generates an id.
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(!response
        .headers()
        .get("x-request-id")
        .expect("Missing x-request-id header")
        .is_empty());
}
