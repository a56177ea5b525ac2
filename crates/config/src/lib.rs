//! foundation-config - 配置加载库
//!
//! 加载顺序（后者覆盖前者）：
//! 1. 结构体默认值
//! 2. `{config_dir}/default.toml`
//! 3. `{config_dir}/{APP_ENV}.toml`
//! 4. `FOUNDATION_` 前缀的环境变量，`__` 分隔嵌套字段，如 `FOUNDATION_LOGGER__LEVEL=debug`

use std::net::SocketAddr;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "FOUNDATION_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 应用元信息
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub env: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "microservice".to_string(),
            version: "1.0.0".to_string(),
            env: "development".to_string(),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// 为 false 时不注册日志单元（由调用方自行安装 subscriber）
    pub enabled: bool,
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// 链路追踪配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    pub sample_rate: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            endpoint: "http://jaeger:14268".to_string(),
            sample_rate: 1.0,
        }
    }
}

/// Metrics 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            listen_addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// 服务发现配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceDiscoveryConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    pub token: Secret<String>,
}

impl Default for ServiceDiscoveryConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            endpoint: "http://consul:8500".to_string(),
            token: Secret::new(String::new()),
        }
    }
}

/// 消息代理配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub brokers: Vec<String>,
    pub topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            brokers: vec!["kafka:9092".to_string()],
            topic: String::new(),
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            address: "redis:6379".to_string(),
            ttl_secs: 3600,
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub dsn: Secret<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            dsn: Secret::new("postgres://user:pass@db:5432/mydb".to_string()),
        }
    }
}

/// RPC 服务器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            kind: "noop".to_string(),
            address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// 健康检查 HTTP 服务器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub host: String,
    /// 0 表示由系统分配端口
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 9000,
        }
    }
}

impl HealthConfig {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("health address: {e}")))
    }
}

/// 停止策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStrategy {
    /// 按注册逆序逐个停止
    #[default]
    Reverse,
    /// 所有服务并发停止，全部结束后返回
    Concurrent,
}

/// 生命周期配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub stop_strategy: StopStrategy,
    /// 并发停止时同时运行的 stop 数量上限，None 为不限制
    pub stop_concurrency: Option<usize>,
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stop_strategy: StopStrategy::Reverse,
            stop_concurrency: None,
            shutdown_timeout_secs: 30,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppInfo,
    pub logger: LoggerConfig,
    pub tracer: TracerConfig,
    pub metrics: MetricsConfig,
    pub service_discovery: ServiceDiscoveryConfig,
    pub broker: BrokerConfig,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
    pub rpc: RpcConfig,
    pub health: HealthConfig,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置，环境由 `APP_ENV` 决定
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load_from(config_dir, &env)
    }

    /// 按指定环境加载配置
    pub fn load_from(config_dir: &str, env: &str) -> Result<Self, ConfigError> {
        let mut config: Self = Self::figment(config_dir, env).extract()?;
        config.app.env = env.to_string();
        config.validate()?;
        Ok(config)
    }

    /// 构建 Figment，缺失的配置文件会被忽略
    pub fn figment(config_dir: &str, env: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 语义校验，返回第一个错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::Invalid("app.name must not be empty".into()));
        }
        if self.lifecycle.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.shutdown_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.lifecycle.stop_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "lifecycle.stop_concurrency must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tracer.sample_rate) {
            return Err(ConfigError::Invalid(
                "tracer.sample_rate must be within [0, 1]".into(),
            ));
        }
        self.metrics
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("metrics.listen_addr: {e}")))?;
        self.rpc
            .address
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("rpc.address: {e}")))?;
        if self.health.enabled {
            self.health.addr()?;
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.env == "development"
    }
}
