//! No-op 服务发现

use async_trait::async_trait;
use foundation_errors::AppResult;
use foundation_ports::{ServiceDiscovery, ServiceInfo, ServiceState};

#[derive(Debug)]
pub struct NoOpServiceDiscovery {
    name: String,
    state: ServiceState,
}

impl NoOpServiceDiscovery {
    pub fn new() -> Self {
        Self {
            name: "noop-service-discovery".to_string(),
            state: ServiceState::new(),
        }
    }
}

impl Default for NoOpServiceDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl_noop_lifecycle!(NoOpServiceDiscovery);

#[async_trait]
impl ServiceDiscovery for NoOpServiceDiscovery {
    async fn register(&self, _service: ServiceInfo) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn deregister(&self, _service_id: &str) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn get_service(&self, _name: &str) -> AppResult<Vec<ServiceInfo>> {
        self.state.ensure_running(&self.name)?;
        Ok(Vec::new())
    }
}
