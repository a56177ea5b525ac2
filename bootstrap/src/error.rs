//! 生命周期错误

use std::fmt;

use foundation_errors::AppError;
use thiserror::Error;

use crate::orchestrator::Phase;

/// 单个服务的失败记录
#[derive(Debug)]
pub struct ServiceFailure {
    pub service: String,
    pub error: AppError,
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service, self.error)
    }
}

/// 编排器错误
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// 某个服务启动失败，启动序列已中止
    #[error("failed to start {service}: {source}")]
    Start {
        service: String,
        #[source]
        source: AppError,
    },

    /// 一个或多个服务停止失败，其余服务仍已全部尝试停止
    #[error("failed to stop {} service(s): {}", .0.len(), join_failures(.0))]
    Stop(Vec<ServiceFailure>),

    /// 当前阶段不允许该操作
    #[error("cannot {operation} while orchestrator is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },
}

impl LifecycleError {
    /// 启动失败的服务名
    pub fn failed_service(&self) -> Option<&str> {
        match self {
            Self::Start { service, .. } => Some(service),
            _ => None,
        }
    }

    /// 停止失败的记录，非 Stop 错误时为空
    pub fn stop_failures(&self) -> &[ServiceFailure] {
        match self {
            Self::Stop(failures) => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[ServiceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
