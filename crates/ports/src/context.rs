//! 执行上下文
//!
//! 在编排器与受管服务之间传递取消信号与截止时间。一个 `Context` 可以挂载多个
//! 取消令牌：调用方自己的令牌加上编排器的根令牌，任一被取消即视为已取消。

use std::future::Future;
use std::time::Duration;

use foundation_errors::AppError;
use futures::future;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 上下文结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl From<ContextError> for AppError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => AppError::cancelled(err.to_string()),
            ContextError::DeadlineExceeded => AppError::timeout(err.to_string()),
        }
    }
}

/// 可取消、可带截止时间的执行上下文
///
/// 克隆开销很小（内部只是令牌的引用计数），可以直接 move 进后台任务。
#[derive(Debug, Clone, Default)]
pub struct Context {
    tokens: Vec<CancellationToken>,
    deadline: Option<Instant>,
}

impl Context {
    /// 不会被取消、没有截止时间的根上下文
    pub fn background() -> Self {
        Self::default()
    }

    /// 由单个取消令牌构建
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            tokens: vec![token],
            deadline: None,
        }
    }

    /// 派生一个额外监听 `token` 的上下文
    pub fn with_token(&self, token: CancellationToken) -> Self {
        let mut ctx = self.clone();
        ctx.tokens.push(token);
        ctx
    }

    /// 派生一个在 `timeout` 之后过期的上下文
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// 派生一个带截止时间的上下文，已有更早的截止时间时保留更早的那个
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut ctx = self.clone();
        ctx.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        ctx
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 距离截止时间的剩余时长
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// 任一令牌已被取消
    pub fn is_cancelled(&self) -> bool {
        self.tokens.iter().any(CancellationToken::is_cancelled)
    }

    /// 截止时间已过
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// 上下文已结束的原因，未结束时为 None
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            Some(ContextError::Cancelled)
        } else if self.is_expired() {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// 等待任一令牌被取消；没有令牌时永远不会返回
    pub async fn cancelled(&self) {
        if self.tokens.is_empty() {
            return future::pending::<()>().await;
        }
        future::select_all(self.tokens.iter().map(|token| Box::pin(token.cancelled()))).await;
    }

    /// 仅以截止时间约束 `fut`
    ///
    /// stop 钩子执行时上下文已被取消，应使用此方法而非 `run_until_cancelled`
    pub async fn timeout<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| ContextError::DeadlineExceeded),
            None => Ok(fut.await),
        }
    }

    /// 以取消信号和截止时间共同约束 `fut`
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ContextError::Cancelled),
            res = self.timeout(fut) => res,
        }
    }
}
