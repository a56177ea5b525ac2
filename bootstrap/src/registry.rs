//! 服务注册表
//!
//! 按配置中的 `type` 字段选择基础设施实现。每种能力各有一张 kind -> 工厂 的表，
//! 工厂返回具体的能力 trait 对象，调用方无需做任何类型转换。

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use foundation_adapter_noop::{
    NoOpBroker, NoOpCache, NoOpDatabase, NoOpMetrics, NoOpRpcServer, NoOpServiceDiscovery,
    NoOpTracer,
};
use foundation_config::{
    AppInfo, BrokerConfig, CacheConfig, DatabaseConfig, MetricsConfig, RpcConfig,
    ServiceDiscoveryConfig, TracerConfig,
};
use foundation_errors::{AppError, AppResult};
use foundation_ports::{Broker, Cache, Database, Metrics, RpcServer, ServiceDiscovery, Tracer};
use foundation_telemetry::PrometheusMetrics;

/// 工厂可用的依赖，按构建顺序逐步补全
#[derive(Clone)]
pub struct Deps {
    pub app: AppInfo,
    pub tracer: Option<Arc<dyn Tracer>>,
    pub metrics: Option<Arc<dyn Metrics>>,
}

impl Deps {
    pub fn new(app: AppInfo) -> Self {
        Self {
            app,
            tracer: None,
            metrics: None,
        }
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deps")
            .field("app", &self.app)
            .field("tracer", &self.tracer.as_ref().map(|t| t.name()))
            .field("metrics", &self.metrics.as_ref().map(|m| m.name()))
            .finish()
    }
}

/// 工厂函数
pub type Creator<C, T> = Arc<dyn Fn(&C, &Deps) -> AppResult<Arc<T>> + Send + Sync>;

struct Creators<C, T: ?Sized> {
    capability: &'static str,
    creators: HashMap<String, Creator<C, T>>,
}

impl<C, T: ?Sized> Creators<C, T> {
    fn new(capability: &'static str) -> Self {
        Self {
            capability,
            creators: HashMap::new(),
        }
    }

    fn insert<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&C, &Deps) -> AppResult<Arc<T>> + Send + Sync + 'static,
    {
        self.creators.insert(kind.to_string(), Arc::new(creator));
    }

    fn create(&self, kind: &str, config: &C, deps: &Deps) -> AppResult<Arc<T>> {
        let creator = self.creators.get(kind).ok_or_else(|| {
            AppError::config(format!("unknown {} type: {kind}", self.capability))
        })?;
        creator(config, deps)
    }

    fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.creators.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

/// 基础设施工厂注册表
pub struct ServiceRegistry {
    tracers: Creators<TracerConfig, dyn Tracer>,
    metrics: Creators<MetricsConfig, dyn Metrics>,
    discovery: Creators<ServiceDiscoveryConfig, dyn ServiceDiscovery>,
    brokers: Creators<BrokerConfig, dyn Broker>,
    caches: Creators<CacheConfig, dyn Cache>,
    databases: Creators<DatabaseConfig, dyn Database>,
    rpc_servers: Creators<RpcConfig, dyn RpcServer>,
}

impl ServiceRegistry {
    /// 不含任何实现的注册表
    pub fn empty() -> Self {
        Self {
            tracers: Creators::new("tracer"),
            metrics: Creators::new("metrics"),
            discovery: Creators::new("service_discovery"),
            brokers: Creators::new("broker"),
            caches: Creators::new("cache"),
            databases: Creators::new("database"),
            rpc_servers: Creators::new("rpc"),
        }
    }

    /// 预置 `noop` 全家桶与 `prometheus` 指标
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_tracer("noop", |_, _| Ok(Arc::new(NoOpTracer::new())));
        registry.register_metrics("noop", |_, _| Ok(Arc::new(NoOpMetrics::new())));
        registry.register_metrics("prometheus", |config, _| {
            let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
                AppError::config(format!(
                    "invalid metrics listen_addr {}: {e}",
                    config.listen_addr
                ))
            })?;
            Ok(Arc::new(PrometheusMetrics::new(addr)))
        });
        registry.register_service_discovery("noop", |_, _| {
            Ok(Arc::new(NoOpServiceDiscovery::new()))
        });
        registry.register_broker("noop", |_, _| Ok(Arc::new(NoOpBroker::new())));
        registry.register_cache("noop", |_, _| Ok(Arc::new(NoOpCache::new())));
        registry.register_database("noop", |_, _| Ok(Arc::new(NoOpDatabase::new())));
        registry.register_rpc_server("noop", |config, _| {
            Ok(Arc::new(NoOpRpcServer::new(config.address.clone())))
        });

        registry
    }

    pub fn register_tracer<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&TracerConfig, &Deps) -> AppResult<Arc<dyn Tracer>> + Send + Sync + 'static,
    {
        self.tracers.insert(kind, creator);
    }

    pub fn register_metrics<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&MetricsConfig, &Deps) -> AppResult<Arc<dyn Metrics>> + Send + Sync + 'static,
    {
        self.metrics.insert(kind, creator);
    }

    pub fn register_service_discovery<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&ServiceDiscoveryConfig, &Deps) -> AppResult<Arc<dyn ServiceDiscovery>>
            + Send
            + Sync
            + 'static,
    {
        self.discovery.insert(kind, creator);
    }

    pub fn register_broker<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&BrokerConfig, &Deps) -> AppResult<Arc<dyn Broker>> + Send + Sync + 'static,
    {
        self.brokers.insert(kind, creator);
    }

    pub fn register_cache<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&CacheConfig, &Deps) -> AppResult<Arc<dyn Cache>> + Send + Sync + 'static,
    {
        self.caches.insert(kind, creator);
    }

    pub fn register_database<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&DatabaseConfig, &Deps) -> AppResult<Arc<dyn Database>> + Send + Sync + 'static,
    {
        self.databases.insert(kind, creator);
    }

    pub fn register_rpc_server<F>(&mut self, kind: &str, creator: F)
    where
        F: Fn(&RpcConfig, &Deps) -> AppResult<Arc<dyn RpcServer>> + Send + Sync + 'static,
    {
        self.rpc_servers.insert(kind, creator);
    }

    pub fn create_tracer(&self, config: &TracerConfig, deps: &Deps) -> AppResult<Arc<dyn Tracer>> {
        self.tracers.create(&config.kind, config, deps)
    }

    pub fn create_metrics(
        &self,
        config: &MetricsConfig,
        deps: &Deps,
    ) -> AppResult<Arc<dyn Metrics>> {
        self.metrics.create(&config.kind, config, deps)
    }

    pub fn create_service_discovery(
        &self,
        config: &ServiceDiscoveryConfig,
        deps: &Deps,
    ) -> AppResult<Arc<dyn ServiceDiscovery>> {
        self.discovery.create(&config.kind, config, deps)
    }

    pub fn create_broker(&self, config: &BrokerConfig, deps: &Deps) -> AppResult<Arc<dyn Broker>> {
        self.brokers.create(&config.kind, config, deps)
    }

    pub fn create_cache(&self, config: &CacheConfig, deps: &Deps) -> AppResult<Arc<dyn Cache>> {
        self.caches.create(&config.kind, config, deps)
    }

    pub fn create_database(
        &self,
        config: &DatabaseConfig,
        deps: &Deps,
    ) -> AppResult<Arc<dyn Database>> {
        self.databases.create(&config.kind, config, deps)
    }

    pub fn create_rpc_server(
        &self,
        config: &RpcConfig,
        deps: &Deps,
    ) -> AppResult<Arc<dyn RpcServer>> {
        self.rpc_servers.create(&config.kind, config, deps)
    }

    /// 已注册的 (能力, kinds)，用于启动日志
    pub fn describe(&self) -> Vec<(&'static str, Vec<String>)> {
        vec![
            (self.tracers.capability, self.tracers.kinds()),
            (self.metrics.capability, self.metrics.kinds()),
            (self.discovery.capability, self.discovery.kinds()),
            (self.brokers.capability, self.brokers.kinds()),
            (self.caches.capability, self.caches.kinds()),
            (self.databases.capability, self.databases.kinds()),
            (self.rpc_servers.capability, self.rpc_servers.kinds()),
        ]
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
