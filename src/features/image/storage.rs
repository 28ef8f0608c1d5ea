use std::path::{Path, PathBuf};

use axum::body::Bytes;
use sqlx::Row;
use tokio::io::AsyncWriteExt;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::database::Database;
use crate::error::AppError;

use super::types::{ImageKind, ImageMeta};

/// 图片存储：元数据入 SQLite，原图落盘为 `<root>/<id>.<ext>`。
///
/// 先落盘再插行，插行失败回删文件；删除时先删行再删文件。
/// 因此对外可见的行一定有对应文件。写文件期间不持有数据库写锁。
#[derive(Clone, Debug)]
pub struct ImageStore {
    db: Database,
    root: PathBuf,
}

/// 校验外部传入的 ID（必须是 uuid），防止路径穿越
pub fn parse_image_id(raw: &str) -> Result<String, AppError> {
    Uuid::try_parse(raw.trim())
        .map(|u| u.simple().to_string())
        .map_err(|_| AppError::NotFound(format!("图片不存在: {raw}")))
}

/// 以 `create_new` 写入，同名文件已存在时返回 `Conflict`，不会覆盖
async fn write_blob(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(AppError::Conflict(format!("图片文件已存在: {path:?}")));
        }
        Err(e) => return Err(e.into()),
    };

    let written = async {
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;
    if let Err(e) = written {
        drop(file);
        remove_quietly(path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("清理图片文件失败 {:?}: {}", path, e);
    }
}

fn row_to_meta(row: &SqliteRow) -> Result<ImageMeta, AppError> {
    let format: String = row.try_get("format")?;
    let format = ImageKind::parse(&format)
        .ok_or_else(|| AppError::Database(format!("未知的图片格式记录: {format}")))?;
    let width: i64 = row.try_get("width")?;
    let height: i64 = row.try_get("height")?;
    let size_bytes: i64 = row.try_get("size_bytes")?;

    Ok(ImageMeta {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        content_type: row.try_get("content_type")?,
        format,
        width: width.max(0) as u32,
        height: height.max(0) as u32,
        size_bytes: size_bytes.max(0) as u64,
        sha256: row.try_get("sha256")?,
        created_at: row.try_get("created_at")?,
    })
}

impl ImageStore {
    pub fn new(db: Database, root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 确保存储目录存在
    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Storage(format!("创建存储目录失败 {:?}: {e}", self.root))
        })
    }

    fn blob_path(&self, id: &str, kind: ImageKind) -> PathBuf {
        self.root.join(format!("{id}.{}", kind.extension()))
    }

    pub async fn insert(&self, meta: &ImageMeta, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.blob_path(&meta.id, meta.format);
        write_blob(&path, bytes).await?;

        let inserted = sqlx::query(
            "INSERT INTO images (id, filename, content_type, format, width, height, size_bytes, sha256, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meta.id)
        .bind(&meta.filename)
        .bind(&meta.content_type)
        .bind(meta.format.as_str())
        .bind(i64::from(meta.width))
        .bind(i64::from(meta.height))
        .bind(meta.size_bytes as i64)
        .bind(&meta.sha256)
        .bind(&meta.created_at)
        .execute(self.db.pool())
        .await;

        if let Err(e) = inserted {
            remove_quietly(&path).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<ImageMeta>, AppError> {
        let row = sqlx::query("SELECT * FROM images WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(row_to_meta).transpose()
    }

    /// 按上传时间倒序分页，返回 (当前页, 总数)
    pub async fn list(&self, limit: u32, offset: u32) -> Result<(Vec<ImageMeta>, u64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(self.db.pool())
            .await?;

        let rows = sqlx::query(
            "SELECT * FROM images ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.db.pool())
        .await?;

        let items = rows.iter().map(row_to_meta).collect::<Result<Vec<_>, _>>()?;
        Ok((items, total.max(0) as u64))
    }

    pub async fn read_content(&self, meta: &ImageMeta) -> Result<Bytes, AppError> {
        let path = self.blob_path(&meta.id, meta.format);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::Storage(
                format!("图片文件缺失: {}", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除图片；不存在时返回 false
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let Some(meta) = self.get(id).await? else {
            return Ok(false);
        };

        let affected = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Ok(false);
        }

        remove_quietly(&self.blob_path(id, meta.format)).await;
        Ok(true)
    }
}
