//! ports - 抽象 trait 层
//!
//! 定义受管服务的生命周期契约以及所有基础设施的抽象接口

mod broker;
mod cache;
mod context;
mod database;
mod discovery;
mod metrics;
mod rpc;
mod service;
mod tracer;

pub use broker::*;
pub use cache::*;
pub use context::*;
pub use database::*;
pub use discovery::*;
pub use metrics::*;
pub use rpc::*;
pub use service::*;
pub use tracer::*;
