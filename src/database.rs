use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::error::AppError;

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS images (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    content_type TEXT NOT NULL,
    format TEXT NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_images_created ON images(created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_images_sha256 ON images(sha256);
"#;

/// SQLite 连接池封装
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect_sqlite(cfg: &DatabaseConfig) -> Result<Self, AppError> {
        let path = Path::new(&cfg.sqlite_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Database(format!("创建数据库目录失败 {parent:?}: {e}")))?;
        }

        let journal = if cfg.wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let opt = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(journal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections.max(1))
            .connect_with(opt)
            .await
            .map_err(|e| AppError::Database(format!("sqlite connect: {e}")))?;
        Ok(Self { pool })
    }

    /// 幂等建表
    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(SCHEMA_DDL).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 连通性检查
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// 启动时调用：连接数据库并确保表结构存在。
pub async fn init_db(cfg: &DatabaseConfig) -> Result<Database, AppError> {
    let db = Database::connect_sqlite(cfg).await?;
    db.init_schema().await?;
    tracing::info!("数据库已就绪: {}", cfg.sqlite_path);
    Ok(db)
}
