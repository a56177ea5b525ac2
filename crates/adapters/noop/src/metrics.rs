//! No-op 指标

use foundation_ports::{Labels, Metrics, ServiceState};

#[derive(Debug)]
pub struct NoOpMetrics {
    name: String,
    state: ServiceState,
}

impl NoOpMetrics {
    pub fn new() -> Self {
        Self {
            name: "noop-metrics".to_string(),
            state: ServiceState::new(),
        }
    }
}

impl Default for NoOpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl_noop_lifecycle!(NoOpMetrics);

impl Metrics for NoOpMetrics {
    fn counter(&self, _name: &str, _value: u64, _labels: Labels<'_>) {}

    fn gauge(&self, _name: &str, _value: f64, _labels: Labels<'_>) {}

    fn histogram(&self, _name: &str, _value: f64, _labels: Labels<'_>) {}

    fn summary(&self, _name: &str, _value: f64, _labels: Labels<'_>) {}
}
