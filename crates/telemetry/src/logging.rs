//! 日志单元
//!
//! 作为第一个注册的服务：后续服务在自己的 start 中打印的日志都依赖它

use async_trait::async_trait;
use foundation_config::LoggerConfig;
use foundation_errors::{AppError, AppResult};
use foundation_ports::{Context, ManagedService, ServiceState};
use tracing::info;

use crate::try_init_tracing;

pub struct LoggingService {
    config: LoggerConfig,
    state: ServiceState,
}

impl LoggingService {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            state: ServiceState::new(),
        }
    }
}

#[async_trait]
impl ManagedService for LoggingService {
    async fn start(&self, _ctx: &Context) -> AppResult<()> {
        self.state.mark_started("logger")?;
        if let Err(e) = try_init_tracing(&self.config) {
            self.state.rollback_start();
            return Err(AppError::failed_precondition(format!(
                "failed to install tracing subscriber: {e}"
            )));
        }
        info!(
            level = %self.config.level,
            format = ?self.config.format,
            "Logger initialized"
        );
        Ok(())
    }

    async fn stop(&self, _ctx: &Context) -> AppResult<()> {
        if self.state.mark_stopped() {
            info!("Logger stopped");
        }
        Ok(())
    }

    fn name(&self) -> String {
        "logger".to_string()
    }
}
