//! Cache trait 定义

use async_trait::async_trait;
use foundation_errors::AppResult;
use std::time::Duration;

use crate::ManagedService;

/// 缓存 trait
#[async_trait]
pub trait Cache: ManagedService {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// 设置缓存值
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> AppResult<()>;

    /// 删除缓存
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// 原子递增，返回递增后的值
    async fn incr(&self, key: &str) -> AppResult<i64>;
}
