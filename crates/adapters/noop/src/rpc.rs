//! No-op RPC 服务器，只保存路由表，不监听任何端口

use std::collections::BTreeMap;

use foundation_errors::{AppError, AppResult};
use foundation_ports::{RpcHandler, RpcServer, ServiceState};
use parking_lot::Mutex;

pub struct NoOpRpcServer {
    name: String,
    address: String,
    state: ServiceState,
    handlers: Mutex<BTreeMap<String, RpcHandler>>,
}

impl NoOpRpcServer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: "noop-rpc-server".to_string(),
            address: address.into(),
            state: ServiceState::new(),
            handlers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// 直接调用已注册的处理函数
    pub fn call(&self, path: &str, request: &[u8]) -> AppResult<Vec<u8>> {
        self.state.ensure_running(&self.name)?;
        let handler = self
            .handlers
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("no handler for {path}")))?;
        handler(request)
    }
}

impl_noop_lifecycle!(NoOpRpcServer);

impl RpcServer for NoOpRpcServer {
    fn register_handler(&self, path: &str, handler: RpcHandler) -> AppResult<()> {
        if !path.starts_with('/') {
            return Err(AppError::validation(format!(
                "handler path must start with '/': {path}"
            )));
        }
        if self.state.is_running() {
            return Err(AppError::failed_precondition(format!(
                "cannot register {path} after {} has started",
                self.name
            )));
        }
        let mut handlers = self.handlers.lock();
        if handlers.contains_key(path) {
            return Err(AppError::validation(format!(
                "handler already registered for {path}"
            )));
        }
        handlers.insert(path.to_string(), handler);
        Ok(())
    }

    fn handler_paths(&self) -> Vec<String> {
        self.handlers.lock().keys().cloned().collect()
    }
}
