//! 服务发现 trait 定义

use std::collections::HashMap;

use async_trait::async_trait;
use foundation_errors::AppResult;
use serde::{Deserialize, Serialize};

use crate::ManagedService;

/// 注册到服务发现系统中的服务实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

/// 服务注册与发现
#[async_trait]
pub trait ServiceDiscovery: ManagedService {
    async fn register(&self, service: ServiceInfo) -> AppResult<()>;

    async fn deregister(&self, service_id: &str) -> AppResult<()>;

    async fn get_service(&self, name: &str) -> AppResult<Vec<ServiceInfo>>;
}
