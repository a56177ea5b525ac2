//! 健康检查模块
//!
//! 提供 /health 和 /ready 端点，作为受管服务由编排器启停

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use foundation_errors::{AppError, AppResult};
use foundation_ports::{Context, ManagedService, ServiceState};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::orchestrator::Phase;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub checks: Vec<ComponentHealth>,
}

/// 组件健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            checks: vec![],
        }
    }

    pub fn add_check(&mut self, check: ComponentHealth) {
        if check.status != "healthy" {
            self.status = "unhealthy".to_string();
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "healthy".to_string(),
            message: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }
}

/// 存活检查：进程能响应即为健康
pub fn liveness() -> HealthStatus {
    HealthStatus::healthy()
}

/// 就绪检查：编排器处于 Running 才算就绪
pub fn readiness(phase: Phase) -> HealthStatus {
    let mut status = HealthStatus::healthy();
    if phase == Phase::Running {
        status.add_check(ComponentHealth::healthy("orchestrator"));
    } else {
        status.add_check(ComponentHealth::unhealthy(
            "orchestrator",
            format!("orchestrator is {phase}"),
        ));
    }
    status
}

pub fn router(phase: watch::Receiver<Phase>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(phase)
}

/// Liveness 端点处理器
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(liveness()))
}

/// Readiness 端点处理器
async fn ready_handler(State(phase): State<watch::Receiver<Phase>>) -> impl IntoResponse {
    let status = readiness(*phase.borrow());
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

type ServerTask = JoinHandle<std::io::Result<()>>;

/// HTTP 健康检查服务器
pub struct HealthServer {
    addr: SocketAddr,
    phase: watch::Receiver<Phase>,
    state: ServiceState,
    local_addr: Mutex<Option<SocketAddr>>,
    server: Mutex<Option<(CancellationToken, ServerTask)>>,
}

impl HealthServer {
    pub fn new(addr: SocketAddr, phase: watch::Receiver<Phase>) -> Self {
        Self {
            addr,
            phase,
            state: ServiceState::new(),
            local_addr: Mutex::new(None),
            server: Mutex::new(None),
        }
    }

    /// 实际监听的地址，端口配置为 0 时由系统分配
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    async fn serve(&self, ctx: &Context) -> AppResult<()> {
        let listener = ctx
            .run_until_cancelled(tokio::net::TcpListener::bind(self.addr))
            .await?
            .map_err(|e| AppError::unavailable(format!("failed to bind {}: {e}", self.addr)))?;
        let local_addr = listener.local_addr()?;

        let token = CancellationToken::new();
        let shutdown = ctx.with_token(token.clone());
        let app = router(self.phase.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });

        *self.local_addr.lock() = Some(local_addr);
        *self.server.lock() = Some((token, task));
        info!(addr = %local_addr, "Health check HTTP server listening");
        Ok(())
    }
}

#[async_trait]
impl ManagedService for HealthServer {
    async fn start(&self, ctx: &Context) -> AppResult<()> {
        self.state.mark_started("health-server")?;
        if let Err(e) = self.serve(ctx).await {
            self.state.rollback_start();
            return Err(e);
        }
        Ok(())
    }

    async fn stop(&self, ctx: &Context) -> AppResult<()> {
        if !self.state.mark_stopped() {
            return Ok(());
        }

        let server = self.server.lock().take();
        let Some((token, task)) = server else {
            return Ok(());
        };
        token.cancel();

        match ctx.timeout(task).await {
            Ok(Ok(Ok(()))) => {
                info!("Health check HTTP server stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(e.into()),
            Ok(Err(e)) => Err(AppError::internal(format!("health server task panicked: {e}"))),
            Err(e) => {
                warn!("Health check HTTP server did not stop before deadline");
                Err(e.into())
            }
        }
    }

    fn name(&self) -> String {
        "health-server".to_string()
    }
}
