pub mod handler;
pub mod processing;
pub mod storage;
pub mod types;

pub use handler::create_image_router;
pub use storage::ImageStore;
pub use types::{ImageKind, ImageListResponse, ImageMeta};
