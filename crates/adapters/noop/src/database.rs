//! No-op 数据库

use async_trait::async_trait;
use foundation_errors::AppResult;
use foundation_ports::{Database, ServiceState};

#[derive(Debug)]
pub struct NoOpDatabase {
    name: String,
    state: ServiceState,
}

impl NoOpDatabase {
    pub fn new() -> Self {
        Self {
            name: "noop-database".to_string(),
            state: ServiceState::new(),
        }
    }
}

impl Default for NoOpDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl_noop_lifecycle!(NoOpDatabase);

#[async_trait]
impl Database for NoOpDatabase {
    async fn connect(&self) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn disconnect(&self) -> AppResult<()> {
        Ok(())
    }

    async fn health(&self) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }
}
