mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = TestApp::spawn();
    let (status, body) = app.request("GET", "/health", &[], None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "access-service");
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let app = TestApp::spawn();
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
