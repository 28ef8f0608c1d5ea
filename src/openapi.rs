use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// Swagger UI 页面入口
pub const DOCS_PATH: &str = "/docs";
/// Swagger UI 静态资源挂载点（css/js/initializer）
pub const SWAGGER_ASSETS_PATH: &str = "/docs-assets";
/// OpenAPI JSON 文档地址
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Swagger UI 的 servers 配置。
///
/// 图片接口挂载在 `config.api.prefix`（默认 /api/v1）下，
/// 健康检查不带前缀，所以额外提供 `/` 以便切换测试。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("图片接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some("对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）")),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（/ 与 /health）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::root,
        crate::features::health::handler::health_check,
        crate::features::image::handler::upload_image,
        crate::features::image::handler::list_images,
        crate::features::image::handler::get_image,
        crate::features::image::handler::get_image_content,
        crate::features::image::handler::get_thumbnail,
        crate::features::image::handler::delete_image,
    ),
    components(
        schemas(
            crate::error::AppError,
            crate::error::ProblemDetails,
            crate::features::health::HealthResponse,
            crate::features::image::ImageMeta,
            crate::features::image::ImageKind,
            crate::features::image::ImageListResponse,
        )
    ),
    modifiers(&ApiServers),
    tags(
        (name = "Health", description = "健康检查：服务探活。"),
        (name = "Image", description = "图片：上传、列表、元数据、原图下载、缩略图与删除。"),
    ),
    info(
        title = "Image Service API",
        version = env!("CARGO_PKG_VERSION"),
        description = "图片服务 API（Axum + utoipa）。除 / 与 /health 外，图片接口实际挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;

/// `GET /docs`：直接返回 Swagger UI 首页。
///
/// 首页里的资源都是相对路径，注入 `<base>` 指向 [`SWAGGER_ASSETS_PATH`]，
/// 这样不带尾斜杠的 `/docs` 也能正常加载。
pub async fn swagger_index() -> Response {
    let config = Arc::new(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH));
    match utoipa_swagger_ui::serve("index.html", config) {
        Ok(Some(file)) => {
            Html(with_base_href(&String::from_utf8_lossy(&file.bytes))).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("加载 Swagger UI 首页失败: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn with_base_href(index_html: &str) -> String {
    let base = format!("<base href=\"{SWAGGER_ASSETS_PATH}/\">");
    match index_html.find("<head>") {
        Some(pos) => {
            let at = pos + "<head>".len();
            format!("{}\n    {}{}", &index_html[..at], base, &index_html[at..])
        }
        None => format!("{base}\n{index_html}"),
    }
}
