use axum::body::Bytes;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::{AppConfig, StorageConfig};
use crate::database::Database;
use crate::features::image::ImageStore;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub images: ImageStore,
    /// 上传限制与缩略图参数
    pub storage: Arc<StorageConfig>,
    /// 控制并发缩略图生成的信号量（限制 CPU 密集型任务数量）
    pub thumbnail_semaphore: Arc<Semaphore>,
    /// 缩略图缓存（按字节大小加权，键为 `id:size`）
    pub thumbnail_cache: Cache<String, Bytes>,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Database) -> Self {
        let storage = &config.storage;
        let thumbnail_cache = Cache::builder()
            .weigher(|_k, v: &Bytes| u32::try_from(v.len()).unwrap_or(u32::MAX))
            .max_capacity(storage.cache_max_bytes)
            .time_to_live(Duration::from_secs(storage.cache_ttl_secs))
            .time_to_idle(Duration::from_secs(storage.cache_tti_secs))
            .build();

        Self {
            images: ImageStore::new(db.clone(), storage.root_path()),
            db,
            storage: Arc::new(storage.clone()),
            thumbnail_semaphore: Arc::new(Semaphore::new(storage.parallel_permits())),
            thumbnail_cache,
        }
    }
}
