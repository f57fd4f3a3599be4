mod common;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use civic_archive_api::infrastructure::rate_limit::MemoryBackend;
use futures_util::stream;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn limited_payload(max_body: usize, max_batch: usize) -> civic_archive_api::config::Config {
    let mut config = common::test_config();
    config.max_request_body_bytes = max_body;
    config.ingest_max_batch_items = max_batch;
    config
}

fn app(config: &civic_archive_api::config::Config) -> Router {
    common::create_app(config, Arc::new(MemoryBackend::new()), common::peer())
}

async fn json_of(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn stored_count(app: &Router, collection: &str) -> u64 {
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/{}", collection))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    json_of(response).await["total"].as_u64().unwrap()
}

#[tokio::test]
async fn test_declared_length_one_byte_over_is_rejected_unread() {
    let app = app(&limited_payload(64, 200));

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/news")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, "65")
                .body(Body::from(r#"{"id": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_of(response).await;
    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(json["details"]["max_request_body_bytes"], 64);
    assert_eq!(json["details"]["content_length"], 65);

    assert_eq!(stored_count(&app, "news").await, 0);
}

#[tokio::test]
async fn test_declared_length_at_limit_is_accepted() {
    let body = r#"{"id": 1, "title": "x"}"#;
    let app = app(&limited_payload(body.len(), 200));

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/news")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stored_count(&app, "news").await, 1);
}

#[tokio::test]
async fn test_invalid_content_length_is_bad_request() {
    let app = app(&common::test_config());

    let response = app
        .oneshot(
            Request::post("/api/news")
                .header(header::CONTENT_LENGTH, "ten")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_streamed_body_over_limit_despite_small_declared_length() {
    let app = app(&limited_payload(32, 200));

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from(vec![b' '; 20])),
        Ok(Bytes::from(vec![b' '; 20])),
    ];
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/minutes")
                .header(header::CONTENT_LENGTH, "8")
                .body(Body::from_stream(stream::iter(chunks)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_of(response).await;
    assert_eq!(json["details"]["max_request_body_bytes"], 32);
    assert_eq!(json["details"]["request_body_bytes"], 40);
    assert_eq!(json["details"]["content_length"], 8);
}

#[tokio::test]
async fn test_batch_at_limit_accepted_and_one_more_rejected() {
    let server = common::create_server(&limited_payload(1_048_576, 3));

    let at_limit: Vec<Value> = (1..=3).map(|i| json!({"id": i})).collect();
    let response = server.post("/api/segments").json(&at_limit).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["inserted"], 3);

    let over: Vec<Value> = (1..=4).map(|i| json!({"id": i})).collect();
    let response = server.post("/api/segments").json(&over).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let json = response.json::<Value>();
    assert_eq!(json["details"]["max_batch_items"], 3);
    assert_eq!(json["details"]["received_batch_items"], 4);
}

#[tokio::test]
async fn test_non_json_body_is_validation_error() {
    let server = common::create_server(&common::test_config());

    let response = server.post("/api/news").text("title=hello").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_payload_guard_runs_before_auth() {
    let mut config = limited_payload(16, 200);
    config.require_api_key = true;
    let app = app(&config);

    let response = app
        .oneshot(
            Request::post("/api/news")
                .header(header::CONTENT_LENGTH, "1000")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_requests_skip_payload_guard() {
    let app = app(&limited_payload(4, 1));

    let response = app
        .oneshot(
            Request::get("/api/news")
                .header(header::CONTENT_LENGTH, "999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ceiling_above_two_mebibytes_is_honored() {
    const MIB: usize = 1024 * 1024;
    let app = app(&limited_payload(4 * MIB, 200));
    let body = format!(r#"{{"blob":"{}"}}"#, "x".repeat(3 * MIB));

    let response = app
        .oneshot(
            Request::post("/api/echo")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_of(response).await;
    assert_eq!(json["you_sent"]["blob"].as_str().unwrap().len(), 3 * MIB);
}

#[tokio::test]
async fn test_large_ceiling_overflow_uses_uniform_payload() {
    const MIB: usize = 1024 * 1024;
    let app = app(&limited_payload(3 * MIB, 200));
    let body = format!(r#"{{"blob":"{}"}}"#, "x".repeat(3 * MIB));

    let response = app
        .oneshot(
            Request::post("/api/echo")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_of(response).await;
    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(json["details"]["max_request_body_bytes"], 3 * MIB);
}
