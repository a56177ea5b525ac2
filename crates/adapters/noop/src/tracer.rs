//! No-op 链路追踪

use std::collections::HashMap;

use foundation_errors::AppResult;
use foundation_ports::{Carrier, ServiceState, Span, Tracer};

/// 只在内存里记录标签的 span
#[derive(Debug, Default)]
pub struct NoOpSpan {
    name: String,
    tags: HashMap<String, String>,
    finished: bool,
}

impl NoOpSpan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

impl Span for NoOpSpan {
    fn set_tag(&mut self, key: &str, value: &str) {
        if !self.finished {
            self.tags.insert(key.to_string(), value.to_string());
        }
    }

    fn set_error(&mut self, error: &dyn std::error::Error) {
        self.set_tag("error", &error.to_string());
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// No-op 追踪器
#[derive(Debug)]
pub struct NoOpTracer {
    name: String,
    state: ServiceState,
}

impl NoOpTracer {
    pub fn new() -> Self {
        Self::named("noop-tracer")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ServiceState::new(),
        }
    }
}

impl Default for NoOpTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl_noop_lifecycle!(NoOpTracer);

impl Tracer for NoOpTracer {
    fn start_span(&self, name: &str) -> Box<dyn Span> {
        Box::new(NoOpSpan::new(name))
    }

    fn inject(&self, _span: &dyn Span, _carrier: &mut Carrier) -> AppResult<()> {
        Ok(())
    }

    fn extract(&self, _carrier: &Carrier) -> AppResult<Box<dyn Span>> {
        Ok(Box::new(NoOpSpan::new("extracted")))
    }
}
