//! 链路追踪 trait 定义

use std::collections::HashMap;

use foundation_errors::AppResult;

use crate::ManagedService;

/// 跨进程传播 span 上下文的载体（如 HTTP 头、消息元数据）
pub type Carrier = HashMap<String, String>;

/// 追踪 span
pub trait Span: Send + Sync {
    fn set_tag(&mut self, key: &str, value: &str);

    fn set_error(&mut self, error: &dyn std::error::Error);

    /// 结束 span，之后的修改被忽略
    fn finish(&mut self);

    fn is_finished(&self) -> bool;
}

/// 链路追踪器
pub trait Tracer: ManagedService {
    fn start_span(&self, name: &str) -> Box<dyn Span>;

    /// 将 span 上下文写入载体
    fn inject(&self, span: &dyn Span, carrier: &mut Carrier) -> AppResult<()>;

    /// 从载体恢复 span 上下文
    fn extract(&self, carrier: &Carrier) -> AppResult<Box<dyn Span>>;
}
