//! 受管服务契约

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use foundation_errors::{AppError, AppResult};

use crate::Context;

/// 可由编排器启动和停止的服务单元
///
/// - `start`：对已启动的单元再次调用属于调用方错误，应返回错误而非静默忽略
/// - `stop`：尽力而为，即使 start 失败或从未调用也必须安全，不得 panic
/// - `name`：仅用于日志与错误归属，建议唯一
#[async_trait]
pub trait ManagedService: Send + Sync {
    /// 完成初始化后立即返回，长时间运行的工作应在单元自己的任务中进行
    async fn start(&self, ctx: &Context) -> AppResult<()>;

    async fn stop(&self, ctx: &Context) -> AppResult<()>;

    fn name(&self) -> String;
}

#[async_trait]
impl<T> ManagedService for Arc<T>
where
    T: ManagedService + ?Sized,
{
    async fn start(&self, ctx: &Context) -> AppResult<()> {
        (**self).start(ctx).await
    }

    async fn stop(&self, ctx: &Context) -> AppResult<()> {
        (**self).stop(ctx).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// 单元运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopped,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// 单元内部的运行状态跟踪，防止重复启动并让 stop 幂等
#[derive(Debug, Default)]
pub struct ServiceState(AtomicU8);

impl ServiceState {
    pub fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    pub fn get(&self) -> RunState {
        match self.0.load(Ordering::Acquire) {
            IDLE => RunState::Idle,
            RUNNING => RunState::Running,
            _ => RunState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.get() == RunState::Running
    }

    /// Idle -> Running，其他状态返回 FailedPrecondition
    pub fn mark_started(&self, name: &str) -> AppResult<()> {
        match self
            .0
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(RUNNING) => Err(AppError::failed_precondition(format!(
                "{name} is already started"
            ))),
            Err(_) => Err(AppError::failed_precondition(format!(
                "{name} has been stopped and cannot be restarted"
            ))),
        }
    }

    /// start 中途失败时回到 Idle
    pub fn rollback_start(&self) {
        let _ = self
            .0
            .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }

    /// 进入 Stopped，返回之前是否处于 Running
    pub fn mark_stopped(&self) -> bool {
        self.0.swap(STOPPED, Ordering::AcqRel) == RUNNING
    }

    /// 未运行时返回 Unavailable
    pub fn ensure_running(&self, name: &str) -> AppResult<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(AppError::unavailable(format!("{name} is not running")))
        }
    }
}
