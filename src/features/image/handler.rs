use axum::body::{Body, Bytes};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, OriginalUri, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::time::Instant;
use tracing::debug;

use crate::{error::AppError, state::AppState};

use super::processing::{self, MIN_THUMBNAIL_SIZE};
use super::storage::parse_image_id;
use super::types::{
    ImageListResponse, ImageMeta, ListQuery, ThumbnailQuery, UploadQuery,
};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

/// 原图按 ID 不可变，可长期缓存
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

fn etag_for(meta: &ImageMeta) -> String {
    format!("\"{}\"", meta.sha256)
}

/// `If-None-Match` 是否命中（支持逗号分隔列表、弱校验前缀与 `*`）
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(raw) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    raw.split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || tag.trim_start_matches("W/") == etag)
}

fn clamp_page(q: &ListQuery) -> (u32, u32) {
    let limit = q.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (limit, q.offset.unwrap_or(0))
}

fn clamp_thumbnail_size(requested: Option<u32>, default: u32, max: u32) -> u32 {
    let max = max.max(MIN_THUMBNAIL_SIZE);
    requested.unwrap_or(default).clamp(MIN_THUMBNAIL_SIZE, max)
}

async fn load_meta(state: &AppState, raw_id: &str) -> Result<ImageMeta, AppError> {
    let id = parse_image_id(raw_id)?;
    state
        .images
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("图片不存在: {id}")))
}

fn binary_response(content_type: &str, etag: Option<String>, body: Bytes) -> Response {
    let mut res = Response::new(Body::from(body));
    let headers = res.headers_mut();
    if let Ok(v) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, v);
    }
    if let Some(tag) = etag.and_then(|t| HeaderValue::from_str(&t).ok()) {
        headers.insert(header::ETAG, tag);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    );
    res
}

#[utoipa::path(
    post,
    path = "/images",
    summary = "上传图片",
    description = "请求体为图片原始字节。格式由内容探测得出（png/jpeg/gif/webp），与 Content-Type 无关。",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "上传成功", body = ImageMeta),
        (status = 413, description = "请求体过大", body = AppError),
        (status = 415, description = "不支持的图片格式", body = AppError),
        (status = 422, description = "空请求体或图片损坏", body = AppError)
    ),
    tag = "Image"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let t_start = Instant::now();
    if body.is_empty() {
        return Err(AppError::Validation("请求体为空".to_string()));
    }
    if body.len() as u64 > state.storage.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} 字节，上限 {} 字节",
            body.len(),
            state.storage.max_upload_bytes
        )));
    }

    let probed = processing::probe(&body)?;
    if !state.storage.is_format_allowed(probed.kind.as_str()) {
        return Err(AppError::UnsupportedMediaType(format!(
            "{} 未在允许列表中",
            probed.kind.as_str()
        )));
    }

    let id = uuid::Uuid::new_v4().simple().to_string();
    let fallback_name = format!("{id}.{}", probed.kind.extension());
    let meta = ImageMeta {
        filename: processing::sanitize_filename(q.filename.as_deref(), &fallback_name),
        id,
        content_type: probed.kind.content_type().to_string(),
        format: probed.kind,
        width: probed.width,
        height: probed.height,
        size_bytes: body.len() as u64,
        sha256: processing::sha256_hex(&body),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state.images.insert(&meta, &body).await?;
    tracing::info!(
        id = %meta.id,
        format = meta.format.as_str(),
        bytes = meta.size_bytes,
        "图片已保存 ({}ms)",
        t_start.elapsed().as_millis()
    );

    let location = format!("{}/{}", uri.path().trim_end_matches('/'), meta.id);
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, v);
    }
    Ok((StatusCode::CREATED, headers, Json(meta)))
}

#[utoipa::path(
    get,
    path = "/images",
    summary = "图片列表",
    description = "按上传时间倒序分页。",
    params(ListQuery),
    responses((status = 200, description = "图片列表", body = ImageListResponse)),
    tag = "Image"
)]
pub async fn list_images(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ImageListResponse>, AppError> {
    let (limit, offset) = clamp_page(&q);
    let (items, total) = state.images.list(limit, offset).await?;
    Ok(Json(ImageListResponse {
        items,
        total,
        limit,
        offset,
    }))
}

#[utoipa::path(
    get,
    path = "/images/{id}",
    summary = "图片元数据",
    params(("id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, description = "图片元数据", body = ImageMeta),
        (status = 404, description = "图片不存在", body = AppError)
    ),
    tag = "Image"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageMeta>, AppError> {
    Ok(Json(load_meta(&state, &id).await?))
}

#[utoipa::path(
    get,
    path = "/images/{id}/content",
    summary = "下载原图",
    description = "返回原始字节；ETag 为内容 SHA-256，`If-None-Match` 命中时返回 304。",
    params(("id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, description = "原图字节"),
        (status = 304, description = "未修改"),
        (status = 404, description = "图片不存在", body = AppError)
    ),
    tag = "Image"
)]
pub async fn get_image_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let meta = load_meta(&state, &id).await?;
    let etag = etag_for(&meta);
    if etag_matches(&headers, &etag) {
        let mut res = StatusCode::NOT_MODIFIED.into_response();
        if let Ok(v) = HeaderValue::from_str(&etag) {
            res.headers_mut().insert(header::ETAG, v);
        }
        return Ok(res);
    }

    let bytes = state.images.read_content(&meta).await?;
    Ok(binary_response(&meta.content_type, Some(etag), bytes))
}

#[utoipa::path(
    get,
    path = "/images/{id}/thumbnail",
    summary = "获取缩略图",
    description = "PNG 缩略图，等比缩放到 size×size 以内（不放大）。",
    params(
        ("id" = String, Path, description = "图片 ID"),
        ThumbnailQuery
    ),
    responses(
        (status = 200, description = "PNG 字节"),
        (status = 404, description = "图片不存在", body = AppError),
        (status = 422, description = "图片无法解码", body = AppError)
    ),
    tag = "Image"
)]
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ThumbnailQuery>,
) -> Result<Response, AppError> {
    // 先查元数据，已删除的图片不会命中缓存
    let meta = load_meta(&state, &id).await?;
    let size = clamp_thumbnail_size(
        q.size,
        state.storage.thumbnail_default_size,
        state.storage.thumbnail_max_size,
    );
    let cache_key = format!("{}:{size}", meta.id);

    if let Some(hit) = state.thumbnail_cache.get(&cache_key).await {
        debug!("缩略图缓存命中: {}", cache_key);
        return Ok(binary_response("image/png", None, hit));
    }

    let original = state.images.read_content(&meta).await?;
    let _permit = state
        .thumbnail_semaphore
        .acquire()
        .await
        .map_err(|_| AppError::Internal("缩略图信号量已关闭".to_string()))?;

    let t_render = Instant::now();
    let png = tokio::task::spawn_blocking(move || processing::make_thumbnail(&original, size))
        .await
        .map_err(|e| AppError::Internal(format!("缩略图任务失败: {e}")))??;
    debug!(
        "缩略图生成完成: {} ({}ms)",
        cache_key,
        t_render.elapsed().as_millis()
    );

    let png = Bytes::from(png);
    state.thumbnail_cache.insert(cache_key, png.clone()).await;
    Ok(binary_response("image/png", None, png))
}

#[utoipa::path(
    delete,
    path = "/images/{id}",
    summary = "删除图片",
    params(("id" = String, Path, description = "图片 ID")),
    responses(
        (status = 204, description = "已删除"),
        (status = 404, description = "图片不存在", body = AppError)
    ),
    tag = "Image"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_image_id(&id)?;
    if state.images.delete(&id).await? {
        tracing::info!(id = %id, "图片已删除");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("图片不存在: {id}")))
    }
}

/// 图片路由（由调用方挂载到 API 前缀下）
pub fn create_image_router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes).unwrap_or(usize::MAX);
    Router::<AppState>::new()
        .route(
            "/images",
            get(list_images)
                .post(upload_image)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/images/:id", get(get_image).delete(delete_image))
        .route("/images/:id/content", get(get_image_content))
        .route("/images/:id/thumbnail", get(get_thumbnail))
}
