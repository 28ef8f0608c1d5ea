use serde::{Deserialize, Serialize};

/// 服务支持的存储格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }

    /// 落盘文件扩展名
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ImageKind::Png),
            "jpeg" | "jpg" => Some(ImageKind::Jpeg),
            "gif" => Some(ImageKind::Gif),
            "webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub(crate) fn from_image_format(fmt: image::ImageFormat) -> Option<Self> {
        match fmt {
            image::ImageFormat::Png => Some(ImageKind::Png),
            image::ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            image::ImageFormat::Gif => Some(ImageKind::Gif),
            image::ImageFormat::WebP => Some(ImageKind::Webp),
            _ => None,
        }
    }
}

/// 图片元数据
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    /// 服务端生成的图片 ID（uuid，无连字符）
    #[schema(example = "3f2b6c1e9a7d4f0e8b5c2a1d0e9f8a7b")]
    pub id: String,
    /// 原始文件名
    #[schema(example = "cat.png")]
    pub filename: String,
    #[schema(example = "image/png")]
    pub content_type: String,
    pub format: ImageKind,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    /// 内容 SHA-256（hex），同时作为 ETag
    pub sha256: String,
    /// 上传时间（RFC3339, UTC）
    pub created_at: String,
}

/// 上传参数
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// 原始文件名（可选，仅保留最后一段路径）
    #[serde(default)]
    pub filename: Option<String>,
}

/// 列表分页参数
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 每页条数（默认 50，范围 1-200）
    #[serde(default)]
    pub limit: Option<u32>,
    /// 偏移量（默认 0）
    #[serde(default)]
    pub offset: Option<u32>,
}

/// 缩略图参数
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThumbnailQuery {
    /// 目标边长（像素），结果等比缩放到 size×size 以内
    #[serde(default)]
    pub size: Option<u32>,
}

/// 图片列表响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageListResponse {
    pub items: Vec<ImageMeta>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}
