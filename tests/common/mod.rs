#![allow(dead_code)]

use std::io::Cursor;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_service::{AppConfig, AppState, Lifecycle, create_app};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub config: AppConfig,
    _dir: TempDir,
}

impl TestApp {
    pub async fn call(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("call app")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

/// 用临时目录作为数据库与存储目录构建完整应用
pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::default();
    config.database.sqlite_path = dir.path().join("images.db").to_string_lossy().into_owned();
    config.storage.dir = dir.path().join("blobs").to_string_lossy().into_owned();
    customize(&mut config);

    let db = Lifecycle::new().startup(&config).await.expect("startup");
    let router = create_app(AppState::new(&config, db), &config);
    TestApp {
        router,
        config,
        _dir: dir,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).expect("parse json")
}

pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 120, 220])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format)
        .expect("encode image");
    out
}
