//! Metrics trait 定义

use crate::ManagedService;

/// 指标标签
pub type Labels<'a> = &'a [(&'a str, &'a str)];

/// 指标上报
pub trait Metrics: ManagedService {
    fn counter(&self, name: &str, value: u64, labels: Labels<'_>);

    fn gauge(&self, name: &str, value: f64, labels: Labels<'_>);

    fn histogram(&self, name: &str, value: f64, labels: Labels<'_>);

    fn summary(&self, name: &str, value: f64, labels: Labels<'_>);
}
