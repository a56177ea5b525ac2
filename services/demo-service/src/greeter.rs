//! Greeter 业务服务
//!
//! 提供一个 RPC 方法，并在后台周期性地向 broker 发布心跳

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use foundation_errors::{AppError, AppResult};
use foundation_ports::{Broker, Context, ManagedService, RpcHandler, ServiceState};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const SAY_HELLO_PATH: &str = "/greeter.v1.Greeter/SayHello";
pub const HEARTBEAT_TOPIC: &str = "greeter.heartbeat";

/// SayHello：请求体为名字，响应为问候语
pub fn say_hello(request: &[u8]) -> AppResult<Vec<u8>> {
    let name = std::str::from_utf8(request)
        .map_err(|e| AppError::validation(format!("name is not valid UTF-8: {e}")))?
        .trim();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    Ok(format!("Hello, {name}!").into_bytes())
}

pub fn say_hello_handler() -> RpcHandler {
    Arc::new(say_hello)
}

pub struct GreeterService {
    broker: Arc<dyn Broker>,
    interval: Duration,
    state: ServiceState,
    worker: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl GreeterService {
    pub fn new(broker: Arc<dyn Broker>, interval: Duration) -> Self {
        Self {
            broker,
            interval,
            state: ServiceState::new(),
            worker: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ManagedService for GreeterService {
    async fn start(&self, ctx: &Context) -> AppResult<()> {
        self.state.mark_started("greeter")?;

        let token = CancellationToken::new();
        let shutdown = ctx.with_token(token.clone());
        let broker = Arc::clone(&self.broker);
        let mut ticker = tokio::time::interval(self.interval);

        let task = tokio::spawn(async move {
            let mut beats: u64 = 0;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        beats += 1;
                        match broker.publish(HEARTBEAT_TOPIC, &beats.to_be_bytes()).await {
                            Ok(()) => debug!(beats, "Heartbeat published"),
                            Err(e) => warn!(error = %e, "Failed to publish heartbeat"),
                        }
                    }
                }
            }
        });

        *self.worker.lock() = Some((token, task));
        info!(interval_ms = self.interval.as_millis() as u64, "Greeter started");
        Ok(())
    }

    async fn stop(&self, ctx: &Context) -> AppResult<()> {
        if !self.state.mark_stopped() {
            return Ok(());
        }

        let worker = self.worker.lock().take();
        let Some((token, task)) = worker else {
            return Ok(());
        };
        token.cancel();

        ctx.timeout(task)
            .await?
            .map_err(|e| AppError::internal(format!("heartbeat task failed: {e}")))?;
        info!("Greeter stopped");
        Ok(())
    }

    fn name(&self) -> String {
        "greeter".to_string()
    }
}
