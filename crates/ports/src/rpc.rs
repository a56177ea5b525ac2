//! RPC 服务器 trait 定义

use std::sync::Arc;

use foundation_errors::AppResult;

use crate::ManagedService;

/// 单个 RPC 方法的处理函数：原始请求体 -> 原始响应体
pub type RpcHandler = Arc<dyn Fn(&[u8]) -> AppResult<Vec<u8>> + Send + Sync>;

/// RPC 服务器
///
/// 处理函数需在 start 之前注册
pub trait RpcServer: ManagedService {
    fn register_handler(&self, path: &str, handler: RpcHandler) -> AppResult<()>;

    /// 已注册的路径，按字典序
    fn handler_paths(&self) -> Vec<String>;
}
