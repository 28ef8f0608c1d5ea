use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};
use tower_http::trace::{OnResponse, TraceLayer};
use tracing::Span;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::request_id::{RequestId, request_id_middleware};

/// 压缩策略：明确排除不该压缩的响应。
///
/// 图片本身已压缩，SSE 需要实时性，常见二进制下载类型压缩收益不确定。
/// SVG 仍会被压缩。
pub fn compression_predicate() -> impl Predicate {
    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
        .and(NotForContentType::const_new("application/zip"))
        .and(NotForContentType::const_new("application/gzip"))
}

/// 请求结束日志。trace 位于压缩与 CORS 之外，响应体类型随内层变化，所以对 `B` 泛型。
#[derive(Debug, Clone, Copy, Default)]
struct LogResponse;

impl<B> OnResponse<B> for LogResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = latency.as_millis() as u64,
            "request finished"
        );
    }
}

/// 挂载全局中间件（由外到内）：request_id → trace → CORS → 压缩。
///
/// CORS 直接应答的预检请求也会经过 trace。
pub fn setup_middleware(app: Router, config: &AppConfig) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let request_id = req
                .extensions()
                .get::<RequestId>()
                .map(|r| r.as_str().to_string())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        })
        .on_response(LogResponse);

    let mut app = app.layer(CompressionLayer::new().compress_when(compression_predicate()));

    if let Some(cors) = build_cors_layer(&config.cors) {
        tracing::info!("CORS 已启用");
        app = app.layer(cors);
    }

    app.layer(trace)
        .layer(axum::middleware::from_fn(request_id_middleware))
}
