//! 消息代理 trait 定义

use std::sync::Arc;

use async_trait::async_trait;
use foundation_errors::AppResult;

use crate::ManagedService;

/// 消息处理函数，参数为 (topic, payload)
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) -> AppResult<()> + Send + Sync>;

/// 发布 / 订阅
#[async_trait]
pub trait Broker: ManagedService {
    async fn publish(&self, topic: &str, message: &[u8]) -> AppResult<()>;

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> AppResult<()>;

    async fn unsubscribe(&self, topic: &str) -> AppResult<()>;
}
