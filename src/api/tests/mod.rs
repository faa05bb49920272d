use super::*;
use crate::manager::test_helpers::{
    CHANNEL, MockMediaSource, MockObject, OWNER, RecordingSink, create_test_manager,
    wait_for_state, wait_until_retired,
};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;


/// Router over a fresh manager; the tempdir must outlive the test
async fn create_test_app(
    source: Arc<MockMediaSource>,
) -> (Router, Arc<TaskManager>, Arc<RecordingSink>, tempfile::TempDir) {
    let (manager, sink, temp_dir) = create_test_manager(source).await;
    let manager = Arc::new(manager);
    let config = manager.get_config();
    let app = create_router(manager.clone(), config);
    (app, manager, sink, temp_dir)
}

/// Send one request and decode the JSON body (`Null` when empty)
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn server_stops_when_manager_shuts_down() {
    let (manager, _sink, _temp_dir) = create_test_manager(Arc::new(MockMediaSource::fast())).await;

    let mut config = (*manager.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);
    let manager = Arc::new(manager);

    let server = tokio::spawn(start_api_server(manager.clone(), config));
    tokio::time::sleep(Duration::from_millis(100)).await;

    manager.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cors_headers_are_added_when_enabled() {
    let (app, _manager, _sink, _temp_dir) =
        create_test_app(Arc::new(MockMediaSource::fast())).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn health_reports_version_and_admission() {
    let (app, _manager, _sink, _temp_dir) =
        create_test_app(Arc::new(MockMediaSource::fast())).await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["active"], 0);
    assert_eq!(body["concurrency_limit"], 3);
}

#[tokio::test]
async fn openapi_json_is_served() {
    let (app, _manager, _sink, _temp_dir) =
        create_test_app(Arc::new(MockMediaSource::fast())).await;

    let (status, body) = send(&app, "GET", "/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "tgmedia-dl REST API");
    assert!(body["paths"]["/api/v1/tasks"].is_object());
}

#[tokio::test]
async fn swagger_ui_can_be_disabled() {
    let (manager, _sink, _temp_dir) = create_test_manager(Arc::new(MockMediaSource::fast())).await;
    let mut config = (*manager.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(Arc::new(manager), Arc::new(config));

    let (status, _) = send(&app, "GET", "/swagger-ui", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
