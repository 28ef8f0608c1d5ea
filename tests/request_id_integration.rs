mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};

fn header_value(resp: &axum::http::Response<Body>, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let app = common::spawn_app().await;
    let resp = app.get("/health").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let request_id = header_value(&resp, "x-request-id");
    assert!(request_id.starts_with("req_"), "got {request_id:?}");
}

#[tokio::test]
async fn request_id_uses_client_value_when_valid() {
    let app = common::spawn_app().await;
    let resp = app
        .call(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "client.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(header_value(&resp, "x-request-id"), "client.req-001");
}

#[tokio::test]
async fn invalid_client_value_is_replaced() {
    let app = common::spawn_app().await;
    let resp = app
        .call(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "has space")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    let request_id = header_value(&resp, "x-request-id");
    assert_ne!(request_id, "has space");
    assert!(request_id.starts_with("req_"));
}

#[tokio::test]
async fn problem_details_contains_request_id() {
    let app = common::spawn_app().await;
    let resp = app
        .call(
            Request::builder()
                .uri("/api/v1/images/00000000000000000000000000000000")
                .header("x-request-id", "err.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_value(&resp, "x-request-id"), "err.req-001");
    let json = common::body_json(resp).await;
    assert_eq!(json["requestId"], "err.req-001");
}
