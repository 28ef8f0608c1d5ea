/// 路由组装
pub mod app;

/// 配置模块
pub mod config;

/// CORS 中间件构建
pub mod cors;

/// SQLite 连接与建表
pub mod database;

/// 统一错误处理模块
pub mod error;

/// 功能聚合模块
pub mod features;

/// 启动/关闭钩子
pub mod lifecycle;

/// tracing 初始化
pub mod logging;

/// 全局中间件装配
pub mod middleware;

/// OpenAPI 文档
pub mod openapi;

/// 请求追踪 ID
pub mod request_id;

/// 优雅退出管理模块
pub mod shutdown;

/// 应用状态聚合模块
pub mod state;

#[cfg(test)]
mod test_support;

// 导出常用类型供外部使用
pub use app::create_app;
pub use config::AppConfig;
pub use error::AppError;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;
