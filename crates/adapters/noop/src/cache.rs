//! No-op 缓存，永远未命中

use std::time::Duration;

use async_trait::async_trait;
use foundation_errors::AppResult;
use foundation_ports::{Cache, ServiceState};

#[derive(Debug)]
pub struct NoOpCache {
    name: String,
    state: ServiceState,
}

impl NoOpCache {
    pub fn new() -> Self {
        Self {
            name: "noop-cache".to_string(),
            state: ServiceState::new(),
        }
    }
}

impl Default for NoOpCache {
    fn default() -> Self {
        Self::new()
    }
}

impl_noop_lifecycle!(NoOpCache);

#[async_trait]
impl Cache for NoOpCache {
    async fn get(&self, _key: &str) -> AppResult<Option<Vec<u8>>> {
        self.state.ensure_running(&self.name)?;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        self.state.ensure_running(&self.name)?;
        Ok(false)
    }

    async fn incr(&self, _key: &str) -> AppResult<i64> {
        self.state.ensure_running(&self.name)?;
        Ok(0)
    }
}
