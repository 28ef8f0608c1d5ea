/// 健康检查
pub mod health;
/// 图片上传、查询与缩略图
pub mod image;
