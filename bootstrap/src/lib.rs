//! foundation-bootstrap - 服务生命周期编排
//!
//! 编排器负责按顺序启动、按策略停止所有受管服务；`App` 在其之上按配置装配基础设施。

mod app;
mod error;
mod health;
mod metrics;
mod orchestrator;
mod registry;
mod shutdown;

pub use app::App;
pub use error::{LifecycleError, ServiceFailure};
pub use foundation_config::StopStrategy;
pub use health::{ComponentHealth, HealthServer, HealthStatus};
pub use orchestrator::{Orchestrator, Phase};
pub use registry::{Creator, Deps, ServiceRegistry};
pub use shutdown::{ShutdownController, shutdown_signal};
