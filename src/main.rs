use image_service::{
    AppConfig, AppState, Lifecycle, ShutdownManager, create_app, logging::init_tracing,
};

#[tokio::main]
async fn main() {
    // tracing 依赖配置中的日志级别，配置加载失败时只能直接输出到 stderr
    let config_path = match AppConfig::init_global() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };
    let config = AppConfig::global();
    init_tracing(&config.logging);
    tracing::info!("配置已加载（文件: {:?}，不存在时使用默认值）", config_path);

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let lifecycle = Lifecycle::new();
    let db = match lifecycle.startup(config).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let app = create_app(AppState::new(config, db.clone()), config);

    let addr = config.server_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("ReDoc: http://{}/redoc", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Image API: http://{}{}/images", addr, config.api.prefix);

    let signal = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = signal.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        lifecycle.shutdown(&db).await;
        std::process::exit(1);
    }

    let timeout = config.shutdown.timeout_duration();
    if tokio::time::timeout(timeout, lifecycle.shutdown(&db))
        .await
        .is_err()
    {
        tracing::warn!("关闭钩子超时（{}秒），强制退出", config.shutdown.timeout_secs);
    }

    tracing::info!("服务器已关闭");
}
