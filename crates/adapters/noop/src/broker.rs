//! No-op 消息代理，消息直接丢弃

use async_trait::async_trait;
use foundation_errors::AppResult;
use foundation_ports::{Broker, MessageHandler, ServiceState};

#[derive(Debug)]
pub struct NoOpBroker {
    name: String,
    state: ServiceState,
}

impl NoOpBroker {
    pub fn new() -> Self {
        Self {
            name: "noop-broker".to_string(),
            state: ServiceState::new(),
        }
    }
}

impl Default for NoOpBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl_noop_lifecycle!(NoOpBroker);

#[async_trait]
impl Broker for NoOpBroker {
    async fn publish(&self, _topic: &str, _message: &[u8]) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn subscribe(&self, _topic: &str, _handler: MessageHandler) -> AppResult<()> {
        self.state.ensure_running(&self.name)
    }

    async fn unsubscribe(&self, _topic: &str) -> AppResult<()> {
        Ok(())
    }
}
