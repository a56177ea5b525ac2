use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use foundation_errors::AppResult;

use super::*;

type Journal = Arc<StdMutex<Vec<String>>>;

fn journal() -> Journal {
    Arc::new(StdMutex::new(Vec::new()))
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Probe {
    name: &'static str,
    journal: Journal,
    fail_start: bool,
    fail_stop: bool,
    panic_on_stop: bool,
    start_delay: Option<Duration>,
    stop_delay: Option<Duration>,
    gauge: Option<Arc<Gauge>>,
    cancelled_at_stop: Arc<StdMutex<Option<bool>>>,
}

impl Probe {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: Arc::clone(journal),
            fail_start: false,
            fail_stop: false,
            panic_on_stop: false,
            start_delay: None,
            stop_delay: None,
            gauge: None,
            cancelled_at_stop: Arc::new(StdMutex::new(None)),
        }
    }

    fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    fn panicking_stop(mut self) -> Self {
        self.panic_on_stop = true;
        self
    }

    fn slow_start(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    fn slow_stop(mut self, delay: Duration, gauge: &Arc<Gauge>) -> Self {
        self.stop_delay = Some(delay);
        self.gauge = Some(Arc::clone(gauge));
        self
    }
}

#[async_trait]
impl ManagedService for Probe {
    async fn start(&self, _ctx: &Context) -> AppResult<()> {
        self.journal.lock().unwrap().push(format!("start:{}", self.name));
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start {
            return Err(AppError::unavailable("port in use"));
        }
        Ok(())
    }

    async fn stop(&self, ctx: &Context) -> AppResult<()> {
        *self.cancelled_at_stop.lock().unwrap() = Some(ctx.is_cancelled());
        self.journal.lock().unwrap().push(format!("stop:{}", self.name));

        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gauge) = &self.gauge {
            gauge.leave();
        }

        if self.panic_on_stop {
            panic!("{} blew up", self.name);
        }
        if self.fail_stop {
            return Err(AppError::internal("flush failed"));
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.name.to_string()
    }
}

fn orchestrator_with(probes: Vec<Probe>) -> Orchestrator {
    let mut orchestrator = Orchestrator::new();
    for probe in probes {
        orchestrator.register(probe).unwrap();
    }
    orchestrator
}

#[tokio::test]
async fn test_happy_path_starts_in_order_and_stops_in_reverse() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log),
        Probe::new("C", &log),
    ]);
    let ctx = Context::background();

    orchestrator.start(&ctx).await.unwrap();
    assert_eq!(orchestrator.phase(), Phase::Running);
    assert_eq!(entries(&log), ["start:A", "start:B", "start:C"]);

    orchestrator.stop(&ctx).await.unwrap();
    assert_eq!(orchestrator.phase(), Phase::Stopped);
    assert_eq!(
        entries(&log),
        ["start:A", "start:B", "start:C", "stop:C", "stop:B", "stop:A"]
    );
}

#[tokio::test]
async fn test_start_failure_aborts_remaining_services() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log).failing_start(),
        Probe::new("C", &log),
    ]);

    let err = orchestrator.start(&Context::background()).await.unwrap_err();

    assert_eq!(err.failed_service(), Some("B"));
    let message = err.to_string();
    assert!(message.contains("B"));
    assert!(message.contains("port in use"));
    assert_eq!(entries(&log), ["start:A", "start:B"]);
    assert_eq!(orchestrator.phase(), Phase::Failed);
}

#[tokio::test]
async fn test_stop_after_failed_start_reaches_every_service() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log).failing_start(),
        Probe::new("C", &log),
    ]);
    let ctx = Context::background();

    assert!(orchestrator.start(&ctx).await.is_err());
    orchestrator.stop(&ctx).await.unwrap();

    let log = entries(&log);
    assert_eq!(&log[2..], ["stop:C", "stop:B", "stop:A"]);
    assert_eq!(orchestrator.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_stop_failure_does_not_short_circuit() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log).failing_stop(),
        Probe::new("C", &log),
    ]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let err = orchestrator.stop(&ctx).await.unwrap_err();

    assert_eq!(&entries(&log)[3..], ["stop:C", "stop:B", "stop:A"]);
    let failures = err.stop_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].service, "B");
    assert!(err.to_string().contains("B: Internal error: flush failed"));
    assert_eq!(orchestrator.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_every_stop_failure_is_reported() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log).failing_stop(),
        Probe::new("B", &log),
        Probe::new("C", &log).failing_stop(),
    ]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let err = orchestrator.stop(&ctx).await.unwrap_err();
    let names: Vec<_> = err
        .stop_failures()
        .iter()
        .map(|f| f.service.as_str())
        .collect();
    assert_eq!(names, ["C", "A"]);
}

#[tokio::test]
async fn test_stop_hooks_observe_cancelled_context() {
    let log = journal();
    let probe = Probe::new("A", &log);
    let observed = Arc::clone(&probe.cancelled_at_stop);
    let orchestrator = orchestrator_with(vec![probe]);
    let token = orchestrator.cancellation_token();
    let ctx = Context::background();

    orchestrator.start(&ctx).await.unwrap();
    assert!(!token.is_cancelled());

    orchestrator.stop(&ctx).await.unwrap();
    assert!(token.is_cancelled());
    assert_eq!(*observed.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn test_panicking_stop_is_recorded_as_failure() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log).panicking_stop(),
    ]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let err = orchestrator.stop(&ctx).await.unwrap_err();

    assert_eq!(&entries(&log)[2..], ["stop:B", "stop:A"]);
    let failures = err.stop_failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.to_string().contains("B blew up"));
}

#[tokio::test]
async fn test_empty_orchestrator() {
    let orchestrator = Orchestrator::new();
    let ctx = Context::background();
    assert!(orchestrator.is_empty());

    orchestrator.start(&ctx).await.unwrap();
    assert_eq!(orchestrator.phase(), Phase::Running);
    orchestrator.stop(&ctx).await.unwrap();
    assert_eq!(orchestrator.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![Probe::new("A", &log)]);

    orchestrator.stop(&Context::background()).await.unwrap();

    assert!(entries(&log).is_empty());
    assert_eq!(orchestrator.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_second_stop_is_noop() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![Probe::new("A", &log)]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    orchestrator.stop(&ctx).await.unwrap();
    orchestrator.stop(&ctx).await.unwrap();

    assert_eq!(entries(&log), ["start:A", "stop:A"]);
}

#[tokio::test]
async fn test_double_start_is_rejected() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![Probe::new("A", &log)]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let err = orchestrator.start(&ctx).await.unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            operation: "start",
            phase: Phase::Running
        }
    ));
    assert_eq!(entries(&log), ["start:A"]);
}

#[tokio::test]
async fn test_register_after_start_is_rejected() {
    let log = journal();
    let mut orchestrator = orchestrator_with(vec![Probe::new("A", &log)]);
    orchestrator.start(&Context::background()).await.unwrap();

    let err = orchestrator.register(Probe::new("late", &log)).unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            operation: "register",
            ..
        }
    ));
    assert_eq!(orchestrator.service_names(), ["A"]);
}

#[tokio::test]
async fn test_phase_changes_are_published() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![Probe::new("A", &log)]);
    let mut phases = orchestrator.subscribe();
    let ctx = Context::background();

    assert_eq!(*phases.borrow(), Phase::Idle);
    orchestrator.start(&ctx).await.unwrap();
    assert!(phases.has_changed().unwrap());
    assert_eq!(*phases.borrow_and_update(), Phase::Running);

    orchestrator.stop(&ctx).await.unwrap();
    assert_eq!(*phases.borrow_and_update(), Phase::Stopped);
}

#[tokio::test]
async fn test_concurrent_stop_reaches_every_service() {
    let log = journal();
    let mut orchestrator = Orchestrator::with_strategy(StopStrategy::Concurrent);
    for name in ["A", "B", "C", "D"] {
        orchestrator.register(Probe::new(name, &log)).unwrap();
    }
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    orchestrator.stop(&ctx).await.unwrap();

    let mut stopped: Vec<_> = entries(&log)
        .into_iter()
        .filter(|e| e.starts_with("stop:"))
        .collect();
    stopped.sort();
    assert_eq!(stopped, ["stop:A", "stop:B", "stop:C", "stop:D"]);
    assert_eq!(orchestrator.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_concurrent_stop_collects_errors_and_panics() {
    let log = journal();
    let mut orchestrator = Orchestrator::with_strategy(StopStrategy::Concurrent);
    orchestrator.register(Probe::new("A", &log).failing_stop()).unwrap();
    orchestrator.register(Probe::new("B", &log)).unwrap();
    orchestrator.register(Probe::new("C", &log).panicking_stop()).unwrap();
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let err = orchestrator.stop(&ctx).await.unwrap_err();

    let mut names: Vec<_> = err
        .stop_failures()
        .iter()
        .map(|f| f.service.clone())
        .collect();
    names.sort();
    assert_eq!(names, ["A", "C"]);
    assert_eq!(entries(&log).iter().filter(|e| e.starts_with("stop:")).count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stop_runs_in_parallel() {
    let log = journal();
    let gauge = Arc::new(Gauge::default());
    let mut orchestrator = Orchestrator::with_strategy(StopStrategy::Concurrent);
    for name in ["A", "B", "C"] {
        orchestrator
            .register(Probe::new(name, &log).slow_stop(Duration::from_millis(100), &gauge))
            .unwrap();
    }
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    orchestrator.stop(&ctx).await.unwrap();

    assert_eq!(gauge.max.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stop_honours_limit() {
    let log = journal();
    let gauge = Arc::new(Gauge::default());
    let mut orchestrator =
        Orchestrator::with_strategy(StopStrategy::Concurrent).with_stop_concurrency(2);
    for name in ["A", "B", "C", "D", "E"] {
        orchestrator
            .register(Probe::new(name, &log).slow_stop(Duration::from_millis(100), &gauge))
            .unwrap();
    }
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    orchestrator.stop(&ctx).await.unwrap();

    assert_eq!(gauge.max.load(Ordering::SeqCst), 2);
    assert_eq!(entries(&log).iter().filter(|e| e.starts_with("stop:")).count(), 5);
}

#[tokio::test]
async fn test_concurrent_stop_hooks_observe_cancelled_context() {
    let log = journal();
    let mut orchestrator = Orchestrator::with_strategy(StopStrategy::Concurrent);
    let mut observed = Vec::new();
    for name in ["A", "B", "C", "D"] {
        let probe = Probe::new(name, &log);
        observed.push(Arc::clone(&probe.cancelled_at_stop));
        orchestrator.register(probe).unwrap();
    }
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    orchestrator.stop(&ctx).await.unwrap();

    for seen in &observed {
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_stop_can_be_resumed() {
    let log = journal();
    let gauge = Arc::new(Gauge::default());
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log).slow_stop(Duration::from_secs(10), &gauge),
    ]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), orchestrator.stop(&ctx)).await;
    assert!(abandoned.is_err());
    assert_eq!(orchestrator.phase(), Phase::Stopping);

    orchestrator.stop(&ctx).await.unwrap();

    assert_eq!(orchestrator.phase(), Phase::Stopped);
    assert_eq!(entries(&log)[2..], ["stop:B", "stop:A"]);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_stop_still_settles() {
    let log = journal();
    let gauge = Arc::new(Gauge::default());
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log).slow_stop(Duration::from_secs(10), &gauge),
    ]);
    let mut phases = orchestrator.subscribe();
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), orchestrator.stop(&ctx)).await;
    assert!(abandoned.is_err());

    phases.wait_for(|p| *p == Phase::Stopped).await.unwrap();
    assert_eq!(entries(&log)[2..], ["stop:B", "stop:A"]);
    assert!(orchestrator.stop(&ctx).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_resumed_stop_reports_failures() {
    let log = journal();
    let gauge = Arc::new(Gauge::default());
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log)
            .slow_stop(Duration::from_secs(10), &gauge)
            .failing_stop(),
    ]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), orchestrator.stop(&ctx)).await;
    assert!(abandoned.is_err());

    let err = orchestrator.stop(&ctx).await.unwrap_err();
    assert_eq!(err.stop_failures().len(), 1);
    assert_eq!(err.stop_failures()[0].service, "B");
    assert_eq!(orchestrator.phase(), Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_start_settles_to_failed() {
    let log = journal();
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log).slow_start(Duration::from_secs(10)),
        Probe::new("B", &log),
    ]);
    let ctx = Context::background();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), orchestrator.start(&ctx)).await;
    assert!(abandoned.is_err());
    assert_eq!(orchestrator.phase(), Phase::Failed);

    orchestrator.stop(&ctx).await.unwrap();
    assert_eq!(orchestrator.phase(), Phase::Stopped);
    assert_eq!(entries(&log), ["start:A", "stop:B", "stop:A"]);
}

#[tokio::test(start_paused = true)]
async fn test_reverse_stop_is_sequential() {
    let log = journal();
    let gauge = Arc::new(Gauge::default());
    let orchestrator = orchestrator_with(vec![
        Probe::new("A", &log).slow_stop(Duration::from_millis(50), &gauge),
        Probe::new("B", &log).slow_stop(Duration::from_millis(50), &gauge),
    ]);
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    orchestrator.stop(&ctx).await.unwrap();

    assert_eq!(gauge.max.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wait_for_shutdown_signal_via_controller() {
    let log = journal();
    let orchestrator = Arc::new(orchestrator_with(vec![
        Probe::new("A", &log),
        Probe::new("B", &log),
    ]));
    let ctx = Context::background();
    orchestrator.start(&ctx).await.unwrap();

    let waiter = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator
                .wait_for_shutdown_signal(&Context::background())
                .await
        })
    };
    orchestrator.shutdown_controller().shutdown();

    waiter.await.unwrap().unwrap();
    assert_eq!(entries(&log), ["start:A", "start:B", "stop:B", "stop:A"]);
    assert_eq!(orchestrator.phase(), Phase::Stopped);
}

#[tokio::test]
async fn test_drop_cancels_root_token() {
    let orchestrator = Orchestrator::new();
    let token = orchestrator.cancellation_token();
    drop(orchestrator);
    assert!(token.is_cancelled());
}

#[test]
fn test_phase_display() {
    assert_eq!(Phase::Idle.to_string(), "idle");
    assert_eq!(Phase::Stopping.to_string(), "stopping");
}
