//! 服务生命周期：Stopped → Running → Stopped
//!
//! 启动钩子负责打印启动日志、初始化数据库与存储目录；关闭钩子打印关闭日志并释放连接池。

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AppConfig;
use crate::database::{Database, init_db};
use crate::error::AppError;
use crate::features::image::ImageStore;

pub const STARTUP_MESSAGE: &str = "Starting Image Service...";
pub const SHUTDOWN_MESSAGE: &str = "Shutting down Image Service...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Running,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    running: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        if self.running.load(Ordering::SeqCst) {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        }
    }

    /// 启动钩子。失败时状态回到 Stopped，由调用方决定是否退出进程。
    ///
    /// 进入时先抢占 Running，并发调用只有一个能继续初始化。
    pub async fn startup(&self, config: &AppConfig) -> Result<Database, AppError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Internal("服务已在运行".to_string()));
        }
        tracing::info!("{}", STARTUP_MESSAGE);

        match Self::init_resources(config).await {
            Ok(db) => Ok(db),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn init_resources(config: &AppConfig) -> Result<Database, AppError> {
        let db = init_db(&config.database).await?;
        let store = ImageStore::new(db.clone(), config.storage.root_path());
        if let Err(e) = store.ensure_root().await {
            db.close().await;
            return Err(e);
        }
        Ok(db)
    }

    /// 关闭钩子。未运行时只记录日志。
    pub async fn shutdown(&self, db: &Database) {
        if !self.running.swap(false, Ordering::SeqCst) {
            tracing::debug!("服务未运行，忽略关闭请求");
            return;
        }
        tracing::info!("{}", SHUTDOWN_MESSAGE);
        db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureWriter;

    fn temp_config(dir: &tempfile::TempDir) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.database.sqlite_path = dir.path().join("db/images.db").to_string_lossy().into_owned();
        cfg.storage.dir = dir.path().join("blobs").to_string_lossy().into_owned();
        cfg
    }

    #[tokio::test]
    async fn startup_then_shutdown_walks_the_state_machine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(&dir);
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        let db = lifecycle.startup(&cfg).await.expect("startup");
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        assert!(dir.path().join("blobs").is_dir());
        db.ping().await.expect("ping");

        lifecycle.shutdown(&db).await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn second_startup_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(&dir);
        let lifecycle = Lifecycle::new();
        let db = lifecycle.startup(&cfg).await.expect("startup");

        assert!(lifecycle.startup(&cfg).await.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        lifecycle.shutdown(&db).await;
    }

    #[tokio::test]
    async fn concurrent_startups_let_only_one_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(&dir);
        let lifecycle = Lifecycle::new();

        let (a, b) = tokio::join!(lifecycle.startup(&cfg), lifecycle.startup(&cfg));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        let db = a.or(b).expect("one startup succeeds");
        lifecycle.shutdown(&db).await;
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn startup_can_retry_after_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = temp_config(&dir);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").expect("write blocker");
        cfg.storage.dir = blocker.join("blobs").to_string_lossy().into_owned();

        let lifecycle = Lifecycle::new();
        let err = lifecycle.startup(&cfg).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        cfg.storage.dir = dir.path().join("blobs").to_string_lossy().into_owned();
        let db = lifecycle.startup(&cfg).await.expect("retry");
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        lifecycle.shutdown(&db).await;
    }

    #[tokio::test]
    async fn failed_database_init_keeps_service_stopped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = temp_config(&dir);
        // 父路径是一个普通文件，无法创建数据库目录
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").expect("write blocker");
        cfg.database.sqlite_path = blocker.join("images.db").to_string_lossy().into_owned();

        let lifecycle = Lifecycle::new();
        let err = lifecycle.startup(&cfg).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn hooks_log_fixed_messages() {
        let writer = CaptureWriter::default();
        let _guard = tracing::subscriber::set_default(writer.subscriber());

        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = temp_config(&dir);
        let lifecycle = Lifecycle::new();

        let db = lifecycle.startup(&cfg).await.expect("startup");
        assert!(writer.contents().contains(STARTUP_MESSAGE));
        assert!(!writer.contents().contains(SHUTDOWN_MESSAGE));

        lifecycle.shutdown(&db).await;
        assert!(writer.contents().contains(SHUTDOWN_MESSAGE));
    }
}
