use axum::{Router, routing::get};
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::features::{health, image};
use crate::middleware::setup_middleware;
use crate::openapi::{
    ApiDoc, DOCS_PATH, OPENAPI_JSON_PATH, SWAGGER_ASSETS_PATH, swagger_index,
};
use crate::state::AppState;

/// 组装完整路由：健康检查、图片接口、文档页，并挂载全局中间件。
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let image_router = image::create_image_router(config.storage.max_upload_bytes);

    let prefix = config.api.prefix.trim_end_matches('/');
    let router = Router::<AppState>::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check));
    let router = if prefix.is_empty() {
        router.merge(image_router)
    } else {
        router.nest(prefix, image_router)
    };

    // swagger-ui 自带的 axum 路由会把不带斜杠的入口重定向，入口页由 swagger_index 直接提供
    let app = router
        .route(DOCS_PATH, get(swagger_index))
        .route(&format!("{DOCS_PATH}/"), get(swagger_index))
        .merge(SwaggerUi::new(SWAGGER_ASSETS_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .with_state(state);

    setup_middleware(app, config)
}
