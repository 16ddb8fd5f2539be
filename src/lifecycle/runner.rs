//! Runner
//!
//! Sequences init, start and stop across every registered module.

use super::{Registry, RunContext};
use crate::error::{ConductorError, Result, merge};
use crate::module::Module;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strum_macros::Display;

/// Module lifecycle phase, used to qualify module failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Init,
    Start,
    Stop,
}

/// Where the runner currently is within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunnerState {
    Idle,
    Initializing,
    Starting,
    Running,
    RollingBack,
    Stopping,
    Stopped,
    /// Init or start failed; nothing is left running
    Failed,
}

#[derive(Debug)]
struct Tracked {
    generation: u64,
    state: RunnerState,
}

/// Drives modules through their phases in registration order and stops
/// them in reverse.
///
/// Init and start abort at the first failure. Stop never does: every module
/// in the affected set gets its stop call and all failures are reported
/// together.
///
/// Clones share one state slot. Each run works on the handle returned by
/// [`begin_run`](Self::begin_run); transitions from a handle of an earlier
/// run, such as an abandoned stop task, are ignored.
#[derive(Clone)]
pub struct Runner {
    registry: Arc<Registry>,
    state: Arc<Mutex<Tracked>>,
    generation: u64,
}

impl Runner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: Arc::new(Mutex::new(Tracked {
                generation: 0,
                state: RunnerState::Idle,
            })),
            generation: 0,
        }
    }

    fn tracked(&self) -> MutexGuard<'_, Tracked> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunnerState {
        self.tracked().state
    }

    /// Handle for a new run. Resets the state to `Idle` and retires every
    /// handle of earlier runs.
    pub fn begin_run(&self) -> Runner {
        let mut tracked = self.tracked();
        tracked.generation += 1;
        tracked.state = RunnerState::Idle;
        Runner {
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            generation: tracked.generation,
        }
    }

    fn transition(&self, next: RunnerState) {
        let mut tracked = self.tracked();
        if tracked.generation != self.generation {
            tracing::trace!(to = %next, "ignoring transition from a finished run");
            return;
        }
        let previous = tracked.state;
        tracing::trace!(from = %previous, to = %next, "runner transition");
        tracked.state = next;
    }

    /// Initialize every module in registration order.
    ///
    /// The first failure is returned as-is; nothing has started yet, so
    /// nothing is stopped.
    pub async fn init_all(&self, ctx: &RunContext) -> Result<()> {
        self.transition(RunnerState::Initializing);
        let modules = self.registry.snapshot();

        for module in &modules {
            tracing::debug!(module = module.name(), "initializing module");
            if let Err(source) = module.init(ctx).await {
                tracing::error!(module = module.name(), error = %source, "module init failed");
                self.transition(RunnerState::Failed);
                return Err(ConductorError::module_phase(module.name(), Phase::Init, source));
            }
        }

        tracing::info!("init complete ({} modules)", modules.len());
        Ok(())
    }

    /// Start every module in registration order.
    ///
    /// If the module at position N fails, modules `[0..N)` are stopped in
    /// reverse order and the start failure is returned joined with any stop
    /// failures from that rollback. On success the started modules are
    /// returned in start order.
    pub async fn start_all(&self, ctx: &RunContext) -> Result<Vec<Arc<dyn Module>>> {
        self.transition(RunnerState::Starting);
        let modules = self.registry.snapshot();
        let mut started: Vec<Arc<dyn Module>> = Vec::with_capacity(modules.len());

        for module in modules {
            tracing::debug!(module = module.name(), "starting module");
            if let Err(source) = module.start(ctx).await {
                tracing::error!(module = module.name(), error = %source, "module start failed");
                let failure = ConductorError::module_phase(module.name(), Phase::Start, source);
                // The run context may already be cancelled; rollback gets its own.
                let rollback = self.rollback(&ctx.detached(), &started).await;
                return Err(match rollback {
                    Ok(()) => failure,
                    Err(stop_errors) => failure.and(stop_errors),
                });
            }
            started.push(module);
        }

        self.transition(RunnerState::Running);
        tracing::info!("start complete ({} modules)", started.len());
        Ok(started)
    }

    /// Stop an already-started subset after a failure and mark the run failed.
    pub async fn rollback(&self, ctx: &RunContext, started: &[Arc<dyn Module>]) -> Result<()> {
        self.transition(RunnerState::RollingBack);
        tracing::warn!("rolling back {} started modules", started.len());
        let result = self.shutdown_modules(ctx, started).await;
        self.transition(RunnerState::Failed);
        result
    }

    /// Stop `modules` in reverse order.
    ///
    /// Every module is stopped even if an earlier stop fails; failures are
    /// logged as they happen and returned joined.
    pub async fn shutdown_modules(
        &self,
        ctx: &RunContext,
        modules: &[Arc<dyn Module>],
    ) -> Result<()> {
        let mut results = Vec::with_capacity(modules.len());

        for module in modules.iter().rev() {
            tracing::debug!(module = module.name(), "stopping module");
            let result = module.stop(ctx).await.map_err(|source| {
                tracing::error!(module = module.name(), error = %source, "failed to stop module");
                ConductorError::module_phase(module.name(), Phase::Stop, source)
            });
            results.push(result);
        }

        merge(results)
    }

    /// Stop every registered module in reverse registration order.
    pub async fn shutdown_all(&self, ctx: &RunContext) -> Result<()> {
        self.transition(RunnerState::Stopping);
        let result = self.shutdown_modules(ctx, &self.registry.snapshot()).await;
        self.transition(RunnerState::Stopped);
        result
    }
}
