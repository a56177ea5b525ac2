//! 服务生命周期编排器
//!
//! 按注册顺序逐个启动服务（任一失败立即中止），收到关闭请求后先取消根令牌，
//! 再停止全部服务（逆序串行或并发），单个服务停止失败不会中断其余服务。

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use foundation_config::StopStrategy;
use foundation_errors::AppError;
use foundation_ports::{Context, ManagedService};
use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{LifecycleError, ServiceFailure};
use crate::metrics::{record_service_start, record_service_stop, set_running};
use crate::shutdown::{ShutdownController, shutdown_signal};

/// 编排器阶段
///
/// `Idle -> Starting -> Running -> Stopping -> Stopped`，启动失败时
/// `Starting -> Failed`，Failed 仍可调用 stop 释放已启动的服务。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Running,
    Failed,
    Stopping,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

type StopTask = JoinHandle<Vec<ServiceFailure>>;

/// 生命周期编排器
pub struct Orchestrator {
    services: Vec<Arc<dyn ManagedService>>,
    root: CancellationToken,
    strategy: StopStrategy,
    stop_concurrency: Option<usize>,
    phase: Arc<watch::Sender<Phase>>,
    // start / stop 互斥；进行中的停止任务保存在锁内，调用方放弃等待后可再次 stop 取回结果
    guard: Mutex<Option<StopTask>>,
    shutdown: ShutdownController,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_strategy(StopStrategy::default())
    }

    pub fn with_strategy(strategy: StopStrategy) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            services: Vec::new(),
            root: CancellationToken::new(),
            strategy,
            stop_concurrency: None,
            phase: Arc::new(phase),
            guard: Mutex::new(None),
            shutdown: ShutdownController::new(),
        }
    }

    /// 并发停止时同时执行的 stop 数量上限，仅对 `StopStrategy::Concurrent` 生效
    pub fn with_stop_concurrency(mut self, limit: usize) -> Self {
        self.stop_concurrency = Some(limit.max(1));
        self
    }

    /// 追加一个服务，注册顺序即启动顺序
    pub fn register<S>(&mut self, service: S) -> Result<(), LifecycleError>
    where
        S: ManagedService + 'static,
    {
        let phase = self.phase();
        if phase != Phase::Idle {
            return Err(LifecycleError::InvalidTransition {
                operation: "register",
                phase,
            });
        }
        debug!(
            service = %service.name(),
            position = self.services.len(),
            "Registered service"
        );
        self.services.push(Arc::new(service));
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// 订阅阶段变化
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn strategy(&self) -> StopStrategy {
        self.strategy
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// 按注册顺序返回服务名
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// 程序内部触发关闭的句柄，用于 `wait_for_shutdown_signal`
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// 根令牌的子令牌，stop 开始时被取消
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    fn set_phase(&self, phase: Phase) {
        publish(&self.phase, phase);
    }

    /// 按注册顺序启动全部服务
    ///
    /// 任一服务失败即返回，后续服务不会被启动，已启动的服务也不会被自动回滚。
    pub async fn start(&self, ctx: &Context) -> Result<(), LifecycleError> {
        let _guard = self.guard.lock().await;

        let phase = self.phase();
        if phase != Phase::Idle {
            return Err(LifecycleError::InvalidTransition {
                operation: "start",
                phase,
            });
        }
        self.set_phase(Phase::Starting);
        // start 的 future 被中途丢弃时落到 Failed，之后仍可 stop
        let mut pending = StartingGuard {
            phase: &self.phase,
            armed: true,
        };

        let ctx = ctx.with_token(self.root.clone());
        info!(count = self.services.len(), "Starting all services");

        for service in &self.services {
            let name = service.name();
            let started = Instant::now();

            let result = match AssertUnwindSafe(service.start(&ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(AppError::internal(format!(
                    "start panicked: {}",
                    panic_message(&*panic)
                ))),
            };
            let elapsed = started.elapsed();
            record_service_start(&name, result.is_ok(), elapsed);

            if let Err(e) = result {
                error!(service = %name, error = %e, "Failed to start service");
                pending.armed = false;
                self.set_phase(Phase::Failed);
                return Err(LifecycleError::Start {
                    service: name,
                    source: e,
                });
            }
            info!(
                service = %name,
                elapsed_ms = elapsed.as_millis() as u64,
                "Started service"
            );
        }

        pending.armed = false;
        self.set_phase(Phase::Running);
        info!("All services started successfully");
        Ok(())
    }

    /// 停止全部服务
    ///
    /// Idle / Stopped 时为空操作。先取消根令牌，再对每个服务恰好调用一次 stop，
    /// 收集所有失败后统一返回。
    ///
    /// 停止序列运行在独立任务中：丢弃本 future 不会中断它，阶段最终仍会到达
    /// Stopped；再次调用 stop 会等待同一序列并返回它的结果。
    pub async fn stop(&self, ctx: &Context) -> Result<(), LifecycleError> {
        let mut in_flight = self.guard.lock().await;

        let task = match in_flight.take() {
            Some(task) => {
                debug!("Resuming an interrupted stop sequence");
                task
            }
            None => {
                let phase = self.phase();
                match phase {
                    Phase::Idle | Phase::Stopped => {
                        debug!(%phase, "Nothing to stop");
                        return Ok(());
                    }
                    Phase::Running | Phase::Failed => {}
                    Phase::Starting | Phase::Stopping => {
                        return Err(LifecycleError::InvalidTransition {
                            operation: "stop",
                            phase,
                        });
                    }
                }

                info!(
                    count = self.services.len(),
                    strategy = ?self.strategy,
                    "Stopping all services"
                );
                self.root.cancel();
                self.set_phase(Phase::Stopping);
                self.spawn_stop(ctx.with_token(self.root.clone()))
            }
        };

        let task = in_flight.insert(task);
        let result = task.await;
        *in_flight = None;

        let failures = match result {
            Ok(failures) => failures,
            Err(e) => {
                self.set_phase(Phase::Stopped);
                vec![ServiceFailure {
                    service: "orchestrator".to_string(),
                    error: AppError::internal(format!("stop sequence did not complete: {e}")),
                }]
            }
        };

        if failures.is_empty() {
            info!("All services stopped gracefully");
            Ok(())
        } else {
            error!(failed = failures.len(), "Some services failed to stop");
            Err(LifecycleError::Stop(failures))
        }
    }

    fn spawn_stop(&self, ctx: Context) -> StopTask {
        let services = self.services.clone();
        let strategy = self.strategy;
        let limit = self.stop_concurrency;
        let phase = Arc::clone(&self.phase);

        tokio::spawn(async move {
            let failures = match strategy {
                StopStrategy::Reverse => stop_in_reverse(&services, &ctx).await,
                StopStrategy::Concurrent => stop_concurrently(&services, &ctx, limit).await,
            };
            publish(&phase, Phase::Stopped);
            failures
        })
    }

    /// 等待 SIGINT / SIGTERM 或 `shutdown_controller()` 触发
    pub async fn shutdown_requested(&self) {
        tokio::select! {
            res = shutdown_signal() => {
                if let Err(e) = res {
                    error!(error = %e, "Failed to listen for OS signals, waiting for shutdown trigger");
                    self.shutdown.wait().await;
                }
            }
            _ = self.shutdown.wait() => {}
        }
    }

    /// 阻塞到收到关闭请求，然后以 `ctx` 停止全部服务
    pub async fn wait_for_shutdown_signal(&self, ctx: &Context) -> Result<(), LifecycleError> {
        info!("Waiting for shutdown signal...");
        self.shutdown_requested().await;

        info!("Shutdown requested, stopping services...");
        self.stop(ctx).await
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

fn publish(sender: &watch::Sender<Phase>, phase: Phase) {
    sender.send_replace(phase);
    set_running(phase);
}

struct StartingGuard<'a> {
    phase: &'a watch::Sender<Phase>,
    armed: bool,
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            error!("Start sequence was interrupted");
            publish(self.phase, Phase::Failed);
        }
    }
}

async fn stop_in_reverse(
    services: &[Arc<dyn ManagedService>],
    ctx: &Context,
) -> Vec<ServiceFailure> {
    let mut failures = Vec::new();
    for service in services.iter().rev() {
        if let Err(failure) = stop_service(service.as_ref(), ctx).await {
            failures.push(failure);
        }
    }
    failures
}

async fn stop_concurrently(
    services: &[Arc<dyn ManagedService>],
    ctx: &Context,
    limit: Option<usize>,
) -> Vec<ServiceFailure> {
    let limiter = limit.map(|limit| Arc::new(Semaphore::new(limit)));

    let (names, handles): (Vec<_>, Vec<_>) = services
        .iter()
        .map(|service| {
            let service = Arc::clone(service);
            let ctx = ctx.clone();
            let limiter = limiter.clone();
            let name = service.name();
            let handle = tokio::spawn(async move {
                let _permit = match limiter.as_deref() {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };
                stop_service(service.as_ref(), &ctx).await
            });
            (name, handle)
        })
        .unzip();

    // 屏障：等待每一个 stop 任务结束
    let results = join_all(handles).await;

    names
        .into_iter()
        .zip(results)
        .filter_map(|(name, result)| match result {
            Ok(Ok(())) => None,
            Ok(Err(failure)) => Some(failure),
            Err(e) => {
                error!(service = %name, error = %e, "Stop task did not complete");
                Some(ServiceFailure {
                    service: name,
                    error: AppError::internal(format!("stop task failed: {e}")),
                })
            }
        })
        .collect()
}

async fn stop_service(service: &dyn ManagedService, ctx: &Context) -> Result<(), ServiceFailure> {
    let name = service.name();
    let started = Instant::now();

    let result = match AssertUnwindSafe(service.stop(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(AppError::internal(format!(
            "stop panicked: {}",
            panic_message(&*panic)
        ))),
    };
    record_service_stop(&name, result.is_ok(), started.elapsed());

    match result {
        Ok(()) => {
            info!(service = %name, "Stopped service");
            Ok(())
        }
        Err(e) => {
            error!(service = %name, error = %e, "Failed to stop service");
            Err(ServiceFailure {
                service: name,
                error: e,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests;
