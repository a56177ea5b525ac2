//! 应用装配
//!
//! 按配置构建基础设施单元，按依赖顺序注册到编排器，再追加业务服务。

use std::sync::Arc;
use std::time::Duration;

use foundation_config::AppConfig;
use foundation_errors::{AppError, AppResult};
use foundation_ports::{
    Broker, Cache, Context, Database, ManagedService, Metrics, RpcServer, ServiceDiscovery, Tracer,
};
use foundation_telemetry::LoggingService;
use tracing::{debug, info, warn};

use crate::error::LifecycleError;
use crate::health::HealthServer;
use crate::orchestrator::Orchestrator;
use crate::registry::{Deps, ServiceRegistry};
use crate::shutdown::ShutdownController;

/// 应用
pub struct App {
    config: AppConfig,
    registry: ServiceRegistry,
    orchestrator: Orchestrator,
    initialized: bool,
    tracer: Option<Arc<dyn Tracer>>,
    metrics: Option<Arc<dyn Metrics>>,
    service_discovery: Option<Arc<dyn ServiceDiscovery>>,
    broker: Option<Arc<dyn Broker>>,
    cache: Option<Arc<dyn Cache>>,
    database: Option<Arc<dyn Database>>,
    rpc_server: Option<Arc<dyn RpcServer>>,
    health: Option<Arc<HealthServer>>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self::with_registry(config, ServiceRegistry::new())
    }

    /// 使用自定义注册表，可替换或追加基础设施实现
    pub fn with_registry(config: AppConfig, registry: ServiceRegistry) -> Self {
        let mut orchestrator = Orchestrator::with_strategy(config.lifecycle.stop_strategy);
        if let Some(limit) = config.lifecycle.stop_concurrency {
            orchestrator = orchestrator.with_stop_concurrency(limit);
        }

        Self {
            config,
            registry,
            orchestrator,
            initialized: false,
            tracer: None,
            metrics: None,
            service_discovery: None,
            broker: None,
            cache: None,
            database: None,
            rpc_server: None,
            health: None,
        }
    }

    /// 构建并注册基础设施
    ///
    /// 顺序：logger、tracer、metrics、service discovery、broker、cache、database、
    /// rpc server、health server。业务服务应在此之后通过 `register` 追加。
    pub fn init(&mut self) -> AppResult<()> {
        if self.initialized {
            return Err(AppError::failed_precondition("app is already initialized"));
        }

        let mut deps = Deps::new(self.config.app.clone());

        if self.config.logger.enabled {
            self.add(LoggingService::new(self.config.logger.clone()))?;
        }

        let tracer = self.registry.create_tracer(&self.config.tracer, &deps)?;
        self.add(Arc::clone(&tracer))?;
        deps.tracer = Some(Arc::clone(&tracer));
        self.tracer = Some(tracer);

        let metrics = self.registry.create_metrics(&self.config.metrics, &deps)?;
        self.add(Arc::clone(&metrics))?;
        deps.metrics = Some(Arc::clone(&metrics));
        self.metrics = Some(metrics);

        let discovery = self
            .registry
            .create_service_discovery(&self.config.service_discovery, &deps)?;
        self.add(Arc::clone(&discovery))?;
        self.service_discovery = Some(discovery);

        let broker = self.registry.create_broker(&self.config.broker, &deps)?;
        self.add(Arc::clone(&broker))?;
        self.broker = Some(broker);

        let cache = self.registry.create_cache(&self.config.cache, &deps)?;
        self.add(Arc::clone(&cache))?;
        self.cache = Some(cache);

        let database = self.registry.create_database(&self.config.database, &deps)?;
        self.add(Arc::clone(&database))?;
        self.database = Some(database);

        let rpc_server = self.registry.create_rpc_server(&self.config.rpc, &deps)?;
        self.add(Arc::clone(&rpc_server))?;
        self.rpc_server = Some(rpc_server);

        if self.config.health.enabled {
            let addr = self
                .config
                .health
                .addr()
                .map_err(|e| AppError::config(e.to_string()))?;
            let health = Arc::new(HealthServer::new(addr, self.orchestrator.subscribe()));
            self.add(Arc::clone(&health))?;
            self.health = Some(health);
        }

        self.initialized = true;
        Ok(())
    }

    fn add<S>(&mut self, service: S) -> AppResult<()>
    where
        S: ManagedService + 'static,
    {
        self.orchestrator
            .register(service)
            .map_err(|e| AppError::failed_precondition(e.to_string()))
    }

    /// 注册业务服务，排在基础设施之后启动、之前停止
    pub fn register<S>(&mut self, service: S) -> Result<(), LifecycleError>
    where
        S: ManagedService + 'static,
    {
        self.orchestrator.register(service)
    }

    /// 启动全部服务；日志订阅者由 logger 单元在启动阶段安装，之后才输出应用信息
    pub async fn start(&self) -> Result<(), LifecycleError> {
        self.orchestrator.start(&Context::background()).await?;

        info!(
            app_name = %self.config.app.name,
            version = %self.config.app.version,
            app_env = %self.config.app.env,
            services = self.orchestrator.len(),
            "App started"
        );
        for (capability, kinds) in self.registry.describe() {
            debug!(capability, kinds = ?kinds, "Registered factories");
        }
        Ok(())
    }

    /// 以 `shutdown_timeout_secs` 为期限停止全部服务
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        info!(app_name = %self.config.app.name, "Stopping app");
        let ctx = Context::background().with_timeout(self.shutdown_timeout());
        self.orchestrator.stop(&ctx).await
    }

    /// 启动、等待关闭信号、停止
    ///
    /// 启动失败时会先停止已注册的服务再返回启动错误
    pub async fn run(&self) -> Result<(), LifecycleError> {
        if let Err(e) = self.start().await {
            if let Err(stop_err) = self.stop().await {
                warn!(error = %stop_err, "Cleanup after failed start was incomplete");
            }
            return Err(e);
        }

        self.orchestrator.shutdown_requested().await;
        self.stop().await
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.config.lifecycle.shutdown_timeout_secs)
    }

    pub fn name(&self) -> &str {
        &self.config.app.name
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn shutdown_controller(&self) -> ShutdownController {
        self.orchestrator.shutdown_controller()
    }

    pub fn tracer(&self) -> Option<Arc<dyn Tracer>> {
        self.tracer.clone()
    }

    pub fn metrics(&self) -> Option<Arc<dyn Metrics>> {
        self.metrics.clone()
    }

    pub fn service_discovery(&self) -> Option<Arc<dyn ServiceDiscovery>> {
        self.service_discovery.clone()
    }

    pub fn broker(&self) -> Option<Arc<dyn Broker>> {
        self.broker.clone()
    }

    pub fn cache(&self) -> Option<Arc<dyn Cache>> {
        self.cache.clone()
    }

    pub fn database(&self) -> Option<Arc<dyn Database>> {
        self.database.clone()
    }

    pub fn rpc_server(&self) -> Option<Arc<dyn RpcServer>> {
        self.rpc_server.clone()
    }

    pub fn health_server(&self) -> Option<Arc<HealthServer>> {
        self.health.clone()
    }
}
