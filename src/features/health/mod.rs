pub mod handler;

pub use handler::{HealthResponse, health_check, root};
