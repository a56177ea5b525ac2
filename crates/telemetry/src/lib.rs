//! telemetry - 可观测性库
//!
//! 日志（tracing）与 Prometheus 指标，均以受管服务的形式提供，由编排器统一启停

mod logging;
mod prometheus;

pub use logging::LoggingService;
pub use prometheus::PrometheusMetrics;

use foundation_config::{LogFormat, LoggerConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing_subscriber::util::TryInitError;

/// 构建日志过滤器，`RUST_LOG` 优先于配置中的级别
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// 安装全局 tracing subscriber
///
/// 已经安装过时返回错误而不是 panic
pub fn try_init_tracing(config: &LoggerConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.level));

    match config.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        // 生产环境
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
}
