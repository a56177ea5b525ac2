//! Prometheus 指标单元
//!
//! start 时安装全局 recorder 并在后台任务中运行抓取端点，stop 时结束该任务。
//! 全局 recorder 无法卸载，因此每个进程只能成功启动一个实例。

use std::net::SocketAddr;

use async_trait::async_trait;
use foundation_errors::{AppError, AppResult};
use foundation_ports::{Context, Labels, ManagedService, Metrics, ServiceState};
use metrics::Label;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type ExporterTask = JoinHandle<Result<(), String>>;

pub struct PrometheusMetrics {
    listen_addr: SocketAddr,
    state: ServiceState,
    handle: Mutex<Option<PrometheusHandle>>,
    exporter: Mutex<Option<(CancellationToken, ExporterTask)>>,
}

impl PrometheusMetrics {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            state: ServiceState::new(),
            handle: Mutex::new(None),
            exporter: Mutex::new(None),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// 以 Prometheus 文本格式渲染当前指标，未启动时为 None
    pub fn render(&self) -> Option<String> {
        self.handle.lock().as_ref().map(PrometheusHandle::render)
    }

    fn install(&self, ctx: &Context) -> AppResult<()> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.listen_addr)
            .build()
            .map_err(|e| AppError::internal(format!("failed to build prometheus exporter: {e}")))?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|_| {
            AppError::failed_precondition("a global metrics recorder is already installed")
        })?;

        let token = CancellationToken::new();
        let shutdown = ctx.with_token(token.clone());
        let task = tokio::spawn(async move {
            tokio::select! {
                res = exporter => res.map_err(|e| format!("{e:?}")),
                _ = shutdown.cancelled() => Ok(()),
            }
        });

        *self.handle.lock() = Some(handle);
        *self.exporter.lock() = Some((token, task));
        Ok(())
    }
}

fn to_labels(labels: Labels<'_>) -> Vec<Label> {
    labels
        .iter()
        .map(|(key, value)| Label::new(key.to_string(), value.to_string()))
        .collect()
}

#[async_trait]
impl ManagedService for PrometheusMetrics {
    async fn start(&self, ctx: &Context) -> AppResult<()> {
        self.state.mark_started("prometheus-metrics")?;
        if let Err(e) = self.install(ctx) {
            self.state.rollback_start();
            return Err(e);
        }
        info!(addr = %self.listen_addr, "Prometheus exporter listening");
        Ok(())
    }

    async fn stop(&self, ctx: &Context) -> AppResult<()> {
        if !self.state.mark_stopped() {
            return Ok(());
        }

        let exporter = self.exporter.lock().take();
        let Some((token, task)) = exporter else {
            return Ok(());
        };
        token.cancel();

        match ctx.timeout(task).await {
            Ok(Ok(Ok(()))) => {
                info!(addr = %self.listen_addr, "Prometheus exporter stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(AppError::internal(format!("prometheus exporter failed: {e}"))),
            Ok(Err(e)) => Err(AppError::internal(format!(
                "prometheus exporter task panicked: {e}"
            ))),
            Err(e) => {
                warn!(addr = %self.listen_addr, "Prometheus exporter did not stop before deadline");
                Err(e.into())
            }
        }
    }

    fn name(&self) -> String {
        "prometheus-metrics".to_string()
    }
}

impl Metrics for PrometheusMetrics {
    fn counter(&self, name: &str, value: u64, labels: Labels<'_>) {
        metrics::counter!(name.to_string(), to_labels(labels)).increment(value);
    }

    fn gauge(&self, name: &str, value: f64, labels: Labels<'_>) {
        metrics::gauge!(name.to_string(), to_labels(labels)).set(value);
    }

    fn histogram(&self, name: &str, value: f64, labels: Labels<'_>) {
        metrics::histogram!(name.to_string(), to_labels(labels)).record(value);
    }

    /// 未配置桶时导出器将直方图渲染为 summary
    fn summary(&self, name: &str, value: f64, labels: Labels<'_>) {
        self.histogram(name, value, labels);
    }
}
