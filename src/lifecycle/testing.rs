//! Mock modules shared by the lifecycle tests.

use super::RunContext;
use crate::module::{BackgroundModule, FailureSignal, HealthCheck, Module};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Shared event log, entries look like `"start:db"`.
#[derive(Clone, Default)]
pub(crate) struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Module names recorded for one phase, in call order.
    pub(crate) fn phase(&self, phase: &str) -> Vec<String> {
        let prefix = format!("{phase}:");
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub(crate) fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

pub(crate) struct MockModule {
    name: String,
    recorder: Recorder,
    init_error: Option<String>,
    start_error: Option<String>,
    stop_error: Option<String>,
    init_delay: Duration,
    stop_delay: Duration,
    signal: Option<Arc<FailureSignal>>,
    fail_after: Option<Duration>,
    health: Option<HealthMode>,
}

enum HealthMode {
    Healthy,
    Unhealthy(String),
    /// Waits for cancellation, then fails.
    UntilCancelled,
    /// Never resolves.
    Stuck,
}

impl MockModule {
    pub(crate) fn new(name: &str, recorder: &Recorder) -> Self {
        Self {
            name: name.to_string(),
            recorder: recorder.clone(),
            init_error: None,
            start_error: None,
            stop_error: None,
            init_delay: Duration::ZERO,
            stop_delay: Duration::ZERO,
            signal: None,
            fail_after: None,
            health: None,
        }
    }

    pub(crate) fn failing_init(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    pub(crate) fn failing_start(mut self, message: &str) -> Self {
        self.start_error = Some(message.to_string());
        self
    }

    pub(crate) fn failing_stop(mut self, message: &str) -> Self {
        self.stop_error = Some(message.to_string());
        self
    }

    pub(crate) fn slow_init(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    /// Stop sleeps for `delay` without watching its context.
    pub(crate) fn slow_stop(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    pub(crate) fn background(mut self) -> Self {
        self.signal = Some(Arc::new(FailureSignal::new()));
        self
    }

    /// Background module whose worker fails `delay` after start.
    pub(crate) fn failing_after(self, delay: Duration) -> Self {
        let mut module = self.background();
        module.fail_after = Some(delay);
        module
    }

    pub(crate) fn healthy(mut self) -> Self {
        self.health = Some(HealthMode::Healthy);
        self
    }

    pub(crate) fn unhealthy(mut self, message: &str) -> Self {
        self.health = Some(HealthMode::Unhealthy(message.to_string()));
        self
    }

    /// Health check that only returns once its context is cancelled.
    pub(crate) fn health_until_cancelled(mut self) -> Self {
        self.health = Some(HealthMode::UntilCancelled);
        self
    }

    /// Health check that ignores cancellation and never returns.
    pub(crate) fn stuck_health(mut self) -> Self {
        self.health = Some(HealthMode::Stuck);
        self
    }

    pub(crate) fn signal(&self) -> Option<Arc<FailureSignal>> {
        self.signal.clone()
    }

    fn outcome(&self, error: &Option<String>) -> anyhow::Result<()> {
        match error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Module for MockModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        self.recorder.push(format!("init:{}", self.name));
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        self.outcome(&self.init_error)
    }

    async fn start(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        self.recorder.push(format!("start:{}", self.name));
        if let (Some(signal), Some(delay)) = (self.signal.clone(), self.fail_after) {
            let name = self.name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                signal.report(anyhow::anyhow!("{name} worker crashed"));
            });
        }
        self.outcome(&self.start_error)
    }

    async fn stop(&self, ctx: &RunContext) -> anyhow::Result<()> {
        self.recorder.push(format!("stop:{}", self.name));
        if ctx.is_cancelled() {
            self.recorder.push(format!("stop-cancelled:{}", self.name));
        }
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
            self.recorder.push(format!("stopped:{}", self.name));
        }
        if let Some(signal) = &self.signal {
            signal.close();
        }
        self.outcome(&self.stop_error)
    }

    fn as_background(&self) -> Option<&dyn BackgroundModule> {
        self.signal.as_ref().map(|_| self as &dyn BackgroundModule)
    }

    fn as_health_check(&self) -> Option<&dyn HealthCheck> {
        self.health.as_ref().map(|_| self as &dyn HealthCheck)
    }
}

#[async_trait]
impl BackgroundModule for MockModule {
    async fn failure(&self) -> Option<anyhow::Error> {
        match &self.signal {
            Some(signal) => signal.wait().await,
            None => None,
        }
    }
}

#[async_trait]
impl HealthCheck for MockModule {
    async fn health(&self, ctx: &RunContext) -> anyhow::Result<()> {
        match &self.health {
            Some(HealthMode::Unhealthy(message)) => Err(anyhow::anyhow!("{message}")),
            Some(HealthMode::UntilCancelled) => {
                ctx.cancelled().await;
                self.recorder.push(format!("health-cancelled:{}", self.name));
                Err(anyhow::anyhow!("gave up on {}", ctx.name()))
            }
            Some(HealthMode::Stuck) => std::future::pending().await,
            Some(HealthMode::Healthy) | None => Ok(()),
        }
    }
}
