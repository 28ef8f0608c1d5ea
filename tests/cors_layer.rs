mod common;

use axum::{
    body::Body,
    http::{Request, header},
};

fn cors_enabled(cfg: &mut image_service::AppConfig) {
    cfg.cors.enabled = true;
    cfg.cors.allowed_origins = vec!["https://example.com".to_string()];
    cfg.cors.allowed_methods = vec!["GET".to_string(), "POST".to_string()];
    cfg.cors.allowed_headers = vec!["Content-Type".to_string()];
}

#[tokio::test]
async fn cors_layer_adds_allow_origin_header() {
    let app = common::spawn_app_with(cors_enabled).await;
    let resp = app
        .call(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("missing allow origin"),
        "https://example.com"
    );
}

#[tokio::test]
async fn cors_preflight_includes_allow_methods() {
    let app = common::spawn_app_with(cors_enabled).await;
    let resp = app
        .call(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/v1/images")
                .header(header::ORIGIN, "https://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    let allow_methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .expect("missing allow methods")
        .to_str()
        .expect("invalid allow methods");
    assert!(allow_methods.contains("POST"));
}

#[tokio::test]
async fn cors_disabled_by_default() {
    let app = common::spawn_app().await;
    let resp = app
        .call(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
