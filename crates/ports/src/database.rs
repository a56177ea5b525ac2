//! 数据库 trait 定义

use async_trait::async_trait;
use foundation_errors::AppResult;

use crate::ManagedService;

/// 数据持久化
#[async_trait]
pub trait Database: ManagedService {
    async fn connect(&self) -> AppResult<()>;

    async fn disconnect(&self) -> AppResult<()>;

    /// 连通性检查
    async fn health(&self) -> AppResult<()>;
}
