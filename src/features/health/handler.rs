use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

/// 健康检查响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// 服务名称
    #[schema(example = "image")]
    pub service: String,
    /// 服务状态
    #[schema(example = "healthy")]
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            service: "image".to_string(),
            status: "healthy".to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    summary = "服务根路径",
    description = "与 /health 相同，返回固定的服务状态。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn root() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "用于探活的健康检查端点，无副作用，始终成功。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}
