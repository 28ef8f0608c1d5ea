use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// `RUST_LOG` 未设置时使用的过滤规则
pub fn default_filter(cfg: &LoggingConfig) -> String {
    let level = match cfg.level.trim() {
        "" => "info",
        l => l,
    };
    format!("image_service={level},tower_http={level}")
}

/// 初始化全局 tracing 订阅者。重复初始化时静默忽略（测试中可能多次调用）。
pub fn init_tracing(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cfg)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if cfg.format.eq_ignore_ascii_case("compact") {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing 订阅者已存在，跳过初始化");
    }
}
