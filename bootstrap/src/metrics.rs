//! Metrics 模块
//!
//! 记录服务启停的次数与耗时。未安装全局 recorder 时这些调用均为空操作。

use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::orchestrator::Phase;

/// 记录服务启动
pub fn record_service_start(service: &str, success: bool, elapsed: Duration) {
    let labels = [
        ("service", service.to_string()),
        ("success", success.to_string()),
    ];

    counter!("lifecycle_service_start_total", &labels).increment(1);
    histogram!("lifecycle_service_start_duration_ms", &labels)
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// 记录服务停止
pub fn record_service_stop(service: &str, success: bool, elapsed: Duration) {
    let labels = [
        ("service", service.to_string()),
        ("success", success.to_string()),
    ];

    counter!("lifecycle_service_stop_total", &labels).increment(1);
    histogram!("lifecycle_service_stop_duration_ms", &labels)
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// 当前阶段，Running 为 1，其余为 0
pub fn set_running(phase: Phase) {
    let running = if phase == Phase::Running { 1.0 } else { 0.0 };
    gauge!("lifecycle_running").set(running);
}
