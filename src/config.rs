use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 配置文件路径的环境变量覆盖
const CONFIG_PATH_ENV: &str = "APP_CONFIG_PATH";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 图片接口的路由前缀（为空或 "/" 时直接挂在根路径）
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api/v1".to_string(),
        }
    }
}

/// 数据库配置（SQLite）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 文件路径
    #[serde(default = "DatabaseConfig::default_sqlite_path")]
    pub sqlite_path: String,
    /// 是否启用 WAL
    #[serde(default = "DatabaseConfig::default_wal")]
    pub wal: bool,
    /// 连接池上限
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn default_sqlite_path() -> String {
        "./data/images.db".to_string()
    }
    fn default_wal() -> bool {
        true
    }
    fn default_max_connections() -> u32 {
        5
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: Self::default_sqlite_path(),
            wal: Self::default_wal(),
            max_connections: Self::default_max_connections(),
        }
    }
}

/// 图片存储与缩略图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 原图存放目录
    #[serde(default = "StorageConfig::default_dir")]
    pub dir: String,
    /// 单次上传的最大字节数
    #[serde(default = "StorageConfig::default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// 允许的格式（png/jpeg/gif/webp）
    #[serde(default = "StorageConfig::default_allowed_formats")]
    pub allowed_formats: Vec<String>,
    /// 缩略图默认边长（像素）
    #[serde(default = "StorageConfig::default_thumbnail_size")]
    pub thumbnail_default_size: u32,
    /// 缩略图最大边长（像素）
    #[serde(default = "StorageConfig::default_thumbnail_max")]
    pub thumbnail_max_size: u32,
    /// 缩略图缓存容量（字节），按图片字节大小加权
    #[serde(default = "StorageConfig::default_cache_max_bytes")]
    pub cache_max_bytes: u64,
    /// 缩略图缓存 TTL（秒）
    #[serde(default = "StorageConfig::default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// 缩略图缓存 TTI（秒）
    #[serde(default = "StorageConfig::default_cache_tti")]
    pub cache_tti_secs: u64,
    /// 并发缩略图任务数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
}

impl StorageConfig {
    fn default_dir() -> String {
        "./data/images".to_string()
    }
    fn default_max_upload_bytes() -> u64 {
        20 * 1024 * 1024
    }
    fn default_allowed_formats() -> Vec<String> {
        ["png", "jpeg", "gif", "webp"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
    fn default_thumbnail_size() -> u32 {
        256
    }
    fn default_thumbnail_max() -> u32 {
        1024
    }
    fn default_cache_max_bytes() -> u64 {
        64 * 1024 * 1024
    }
    fn default_cache_ttl() -> u64 {
        300
    }
    fn default_cache_tti() -> u64 {
        60
    }

    /// 实际的缩略图并发许可数
    pub fn parallel_permits(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get(),
            n => n as usize,
        }
    }

    /// 判断某个格式名是否在白名单内（大小写不敏感，`jpg` 视同 `jpeg`）
    pub fn is_format_allowed(&self, format: &str) -> bool {
        let normalize = |s: &str| {
            let lower = s.trim().to_ascii_lowercase();
            if lower == "jpg" { "jpeg".to_string() } else { lower }
        };
        let wanted = normalize(format);
        self.allowed_formats.iter().any(|f| normalize(f) == wanted)
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            max_upload_bytes: Self::default_max_upload_bytes(),
            allowed_formats: Self::default_allowed_formats(),
            thumbnail_default_size: Self::default_thumbnail_size(),
            thumbnail_max_size: Self::default_thumbnail_max(),
            cache_max_bytes: Self::default_cache_max_bytes(),
            cache_ttl_secs: Self::default_cache_ttl(),
            cache_tti_secs: Self::default_cache_tti(),
            max_parallel: 0,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 日志格式：full | compact
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default)]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 关闭钩子的超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 加载配置：内置默认值 → 可选配置文件 → 环境变量覆盖
    ///
    /// 环境变量以 `APP_` 为前缀、`__` 作为层级分隔，例如 `APP_SERVER__PORT=9000`。
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path())
    }

    /// 从指定路径加载（文件不存在时只使用默认值与环境变量）
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default())?)
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    ///
    /// 必须先调用 [`AppConfig::init_global`]。
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置，返回实际使用的配置文件路径
    pub fn init_global() -> Result<PathBuf, ConfigError> {
        let path = Self::get_config_path();
        let config = Self::load_from(&path)?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(path)
    }

    fn get_config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
