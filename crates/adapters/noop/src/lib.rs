//! adapter-noop - 无依赖的基础设施替身
//!
//! 每个实现都只跟踪自身的运行状态：重复启动返回错误，未启动时调用业务方法返回
//! Unavailable，其余操作一律成功且不产生任何外部副作用。

/// 为带有 `name: String` 与 `state: ServiceState` 字段的类型实现 ManagedService
macro_rules! impl_noop_lifecycle {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl foundation_ports::ManagedService for $ty {
            async fn start(
                &self,
                _ctx: &foundation_ports::Context,
            ) -> foundation_errors::AppResult<()> {
                self.state.mark_started(&self.name)?;
                tracing::debug!(service = %self.name, "No-op service started");
                Ok(())
            }

            async fn stop(
                &self,
                _ctx: &foundation_ports::Context,
            ) -> foundation_errors::AppResult<()> {
                if self.state.mark_stopped() {
                    tracing::debug!(service = %self.name, "No-op service stopped");
                }
                Ok(())
            }

            fn name(&self) -> String {
                self.name.clone()
            }
        }
    };
}

mod broker;
mod cache;
mod database;
mod discovery;
mod metrics;
mod rpc;
mod tracer;

pub use broker::NoOpBroker;
pub use cache::NoOpCache;
pub use database::NoOpDatabase;
pub use discovery::NoOpServiceDiscovery;
pub use metrics::NoOpMetrics;
pub use rpc::NoOpRpcServer;
pub use tracer::{NoOpSpan, NoOpTracer};
