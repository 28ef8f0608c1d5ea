use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};

use crate::error::AppError;

use super::types::ImageKind;

/// 缩略图边长下限（像素）
pub const MIN_THUMBNAIL_SIZE: u32 = 16;

/// 从字节中探测出的图片信息（只解析头部，不做完整解码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbedImage {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

/// 根据魔数识别格式并读取尺寸。
///
/// 格式无法识别或不在支持范围内时返回 `UnsupportedMediaType`；
/// 头部损坏返回 `ImageProcessing`。
pub fn probe(bytes: &[u8]) -> Result<ProbedImage, AppError> {
    let format = image::guess_format(bytes)
        .map_err(|_| AppError::UnsupportedMediaType("无法识别的图片格式".to_string()))?;
    let kind = ImageKind::from_image_format(format).ok_or_else(|| {
        AppError::UnsupportedMediaType(format!("{format:?}"))
    })?;

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| AppError::ImageProcessing(format!("读取图片尺寸失败: {e}")))?;
    if width == 0 || height == 0 {
        return Err(AppError::ImageProcessing("图片尺寸为 0".to_string()));
    }

    Ok(ProbedImage {
        kind,
        width,
        height,
    })
}

/// 生成 PNG 缩略图，结果等比缩放到 `size×size` 以内（不放大）。
pub fn make_thumbnail(bytes: &[u8], size: u32) -> Result<Vec<u8>, AppError> {
    let size = size.max(MIN_THUMBNAIL_SIZE);
    let img = image::load_from_memory(bytes)?;
    let thumb = if img.width() <= size && img.height() <= size {
        img
    } else {
        img.thumbnail(size, size)
    };

    let mut out = Vec::new();
    thumb
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| AppError::ImageProcessing(format!("缩略图编码失败: {e}")))?;
    Ok(out)
}

/// 内容 SHA-256（hex）
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// 规整上传文件名：只保留最后一段路径，去掉控制字符，最长 255 字符。
pub fn sanitize_filename(raw: Option<&str>, fallback: &str) -> String {
    let cleaned: String = raw
        .and_then(|s| s.rsplit(['/', '\\']).next())
        .map(|s| s.chars().filter(|c| !c.is_control()).collect::<String>())
        .map(|s| s.trim().chars().take(255).collect())
        .unwrap_or_default();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        fallback.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn encode_solid(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format)
            .expect("encode");
        out
    }

    #[test]
    fn probe_reads_format_and_dimensions() {
        let png = encode_solid(40, 20, ImageFormat::Png);
        let probed = probe(&png).expect("probe png");
        assert_eq!(
            probed,
            ProbedImage {
                kind: ImageKind::Png,
                width: 40,
                height: 20
            }
        );

        let jpeg = encode_solid(8, 9, ImageFormat::Jpeg);
        assert_eq!(probe(&jpeg).expect("probe jpeg").kind, ImageKind::Jpeg);
    }

    #[test]
    fn probe_rejects_non_images() {
        let err = probe(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn probe_rejects_truncated_header() {
        let png = encode_solid(40, 20, ImageFormat::Png);
        let err = probe(&png[..12]).unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
    }

    #[test]
    fn thumbnail_fits_box_and_keeps_aspect() {
        let png = encode_solid(400, 200, ImageFormat::Png);
        let thumb = make_thumbnail(&png, 100).expect("thumb");
        let probed = probe(&thumb).expect("probe thumb");
        assert_eq!(probed.kind, ImageKind::Png);
        assert_eq!((probed.width, probed.height), (100, 50));
    }

    #[test]
    fn thumbnail_never_upscales() {
        let png = encode_solid(30, 10, ImageFormat::Png);
        let thumb = make_thumbnail(&png, 256).expect("thumb");
        let probed = probe(&thumb).expect("probe thumb");
        assert_eq!((probed.width, probed.height), (30, 10));
    }

    #[test]
    fn filename_keeps_last_segment_only() {
        assert_eq!(sanitize_filename(Some("../../etc/passwd"), "x"), "passwd");
        assert_eq!(sanitize_filename(Some("C:\\pics\\cat.png"), "x"), "cat.png");
        assert_eq!(sanitize_filename(Some("  "), "fallback.png"), "fallback.png");
        assert_eq!(sanitize_filename(None, "fallback.png"), "fallback.png");
        assert_eq!(sanitize_filename(Some("dir/.."), "f"), "f");
    }

    #[test]
    fn sha256_is_lower_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
