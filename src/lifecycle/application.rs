//! Application
//!
//! Ties the registry, runner, hooks and background watchers into a single
//! run: init → start → wait → stop, with a bounded graceful shutdown.

use super::background::{self, first_failure};
use super::hooks::run_hooks;
use super::shutdown::listen;
use super::{AppMeta, Hook, HookBoundary, Registry, RunContext, Runner, RunnerState};
use crate::config::{AppConfig, DEFAULT_GRACEFUL_TIMEOUT};
use crate::error::{ConductorError, Result, merge};
use crate::module::Module;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Lifecycle coordinator for a set of modules
///
/// # Example
///
/// ```rust,ignore
/// use conductor::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> conductor::Result<()> {
///     let app = Application::builder()
///         .name("billing")
///         .version(env!("CARGO_PKG_VERSION"))
///         .graceful_timeout(Duration::from_secs(5))
///         .hook(Hook::new().after_start(|ctx| async move {
///             tracing::info!(app = ctx.name(), "ready");
///             Ok(())
///         }))
///         .build()?;
///
///     app.register(Database::new())?;
///     app.register(HttpServer::new())?;
///
///     // Blocks until Ctrl+C / SIGTERM, `app.stop()` or a background failure.
///     app.run().await
/// }
/// ```
pub struct Application {
    meta: RwLock<AppMeta>,
    registry: Arc<Registry>,
    runner: Runner,
    hooks: Vec<Hook>,
    running: AtomicBool,
    active: Mutex<Option<CancellationToken>>,
    graceful_timeout: Duration,
    handle_signals: bool,
}

/// Returns the application to not-running on every exit path of a run.
struct RunGuard<'a> {
    app: &'a Application,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.app.meta_mut().mark_stopped();
        self.app.active().take();
        self.app.running.store(false, Ordering::Release);
    }
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    fn meta_ref(&self) -> RwLockReadGuard<'_, AppMeta> {
        self.meta.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn meta_mut(&self) -> RwLockWriteGuard<'_, AppMeta> {
        self.meta.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a module; fails once the application has been run.
    pub fn register<M>(&self, module: M) -> Result<()>
    where
        M: Module + 'static,
    {
        self.registry.register(Arc::new(module))
    }

    /// Register a module the caller keeps a handle to.
    pub fn register_shared(&self, module: Arc<dyn Module>) -> Result<()> {
        self.registry.register(module)
    }

    pub fn module_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn meta(&self) -> AppMeta {
        self.meta_ref().clone()
    }

    pub fn uptime(&self) -> Duration {
        self.meta_ref().uptime()
    }

    pub fn graceful_timeout(&self) -> Duration {
        self.graceful_timeout
    }

    pub fn runner_state(&self) -> RunnerState {
        self.runner.state()
    }

    /// Check every module that implements [`HealthCheck`](crate::module::HealthCheck).
    ///
    /// Each check receives a context carrying `cancel`. Once `cancel` fires,
    /// a check that has not finished is reported as failed. All failures are
    /// reported together, each tagged with its module name.
    pub async fn health(&self, cancel: CancellationToken) -> Result<()> {
        let ctx = RunContext::new(Arc::new(self.meta()), cancel);
        let mut results = Vec::new();

        for module in self.registry.health_checked_modules() {
            let Some(check) = module.as_health_check() else {
                continue;
            };
            let outcome = tokio::select! {
                biased;
                outcome = check.health(&ctx) => outcome,
                _ = ctx.cancelled() => Err(anyhow::anyhow!("health check cancelled")),
            };
            let result = outcome.map_err(|source| {
                tracing::warn!(module = module.name(), error = %source, "health check failed");
                ConductorError::Health {
                    module: module.name().to_string(),
                    source,
                }
            });
            results.push(result);
        }
        merge(results)
    }

    /// Request shutdown of the current run.
    ///
    /// # Errors
    ///
    /// [`ConductorError::AlreadyStopped`] if no run is in progress or
    /// shutdown was already requested.
    pub fn stop(&self) -> Result<()> {
        match self.active().as_ref() {
            Some(token) if !token.is_cancelled() => {
                tracing::info!("stop requested");
                token.cancel();
                Ok(())
            }
            _ => Err(ConductorError::AlreadyStopped),
        }
    }

    /// Run until a shutdown signal, [`stop`](Self::stop), or a background
    /// module failure.
    pub async fn run(&self) -> Result<()> {
        self.run_until(CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), additionally shutting down when `shutdown`
    /// is cancelled.
    ///
    /// # Errors
    ///
    /// [`ConductorError::AlreadyRunning`] if another run is in progress;
    /// otherwise every failure of the run, joined.
    pub async fn run_until(&self, shutdown: CancellationToken) -> Result<()> {
        let token = shutdown.child_token();
        {
            // Held across the swap so `stop()` never sees a running
            // application without its token.
            let mut active = self.active();
            if self
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(ConductorError::AlreadyRunning);
            }
            *active = Some(token.clone());
        }
        let _guard = RunGuard { app: self };

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", app = %self.meta_ref().name, %run_id);
        self.execute(token).instrument(span).await
    }

    async fn execute(&self, token: CancellationToken) -> Result<()> {
        self.registry.lock();
        // Cancelled on every exit path, which also ends the signal listener.
        let _cancel_on_exit = token.clone().drop_guard();
        let runner = self.runner.begin_run();

        let ctx = {
            let mut meta = self.meta_mut();
            meta.mark_started();
            RunContext::new(Arc::new(meta.clone()), token.clone())
        };

        if self.handle_signals {
            tokio::spawn(listen(token.clone()));
        }

        tracing::info!("initializing modules");
        runner.init_all(&ctx).await?;
        run_hooks(&self.hooks, HookBoundary::BeforeStart, &ctx).await?;

        tracing::info!("starting modules");
        let started = runner.start_all(&ctx).await?;

        if let Err(err) = run_hooks(&self.hooks, HookBoundary::AfterStart, &ctx).await {
            tracing::error!(error = %err, "after start hook failed, shutting down");
            return Err(match runner.rollback(&ctx.detached(), &started).await {
                Ok(()) => err,
                Err(stop_errors) => err.and(stop_errors),
            });
        }

        let mut background = background::collect(self.registry.background_modules());
        tracing::info!("application started");

        let failure = tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("shutdown signal received");
                None
            }
            failure = first_failure(&mut background) => {
                tracing::error!(error = %failure, "background module failed");
                token.cancel();
                Some(failure)
            }
        };
        drop(background);

        let stopped = self.shutdown(&runner, &ctx).await;
        merge([failure.map_or(Ok(()), Err), stopped])
    }

    /// Stop hooks around the stop race. Stop calls and hooks get contexts
    /// detached from the (already cancelled) run token.
    async fn shutdown(&self, runner: &Runner, ctx: &RunContext) -> Result<()> {
        let hook_ctx = ctx.detached();
        if let Err(err) = run_hooks(&self.hooks, HookBoundary::BeforeStop, &hook_ctx).await {
            tracing::error!(error = %err, "before stop hook failed");
        }

        let stopped = self.stop_modules(runner, ctx.detached()).await;
        match &stopped {
            Ok(()) => tracing::info!("shutdown completed successfully"),
            Err(err) => tracing::error!(error = %err, "shutdown completed with errors"),
        }

        let after = run_hooks(&self.hooks, HookBoundary::AfterStop, &hook_ctx).await;
        if let Err(err) = &after {
            tracing::error!(error = %err, "after stop hook failed");
        }

        merge([stopped, after])
    }

    async fn stop_modules(&self, runner: &Runner, stop_ctx: RunContext) -> Result<()> {
        if self.graceful_timeout.is_zero() {
            return runner.shutdown_all(&stop_ctx).await;
        }

        let runner = runner.clone();
        let task_ctx = stop_ctx.clone();
        let stopping = tokio::spawn(async move { runner.shutdown_all(&task_ctx).await });

        tokio::select! {
            joined = stopping => joined?,
            _ = tokio::time::sleep(self.graceful_timeout) => {
                // The stop task keeps running detached; modules see the
                // deadline through their cancelled context.
                stop_ctx.token().cancel();
                tracing::error!(timeout = ?self.graceful_timeout, "graceful shutdown timed out");
                Err(ConductorError::GracefulShutdownTimedOut {
                    timeout: self.graceful_timeout,
                })
            }
        }
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    name: Option<String>,
    version: String,
    environment: String,
    graceful_timeout: Duration,
    hooks: Vec<Hook>,
    handle_signals: bool,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            name: None,
            version: String::new(),
            environment: String::new(),
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
            hooks: Vec::new(),
            handle_signals: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the graceful shutdown window; `Duration::ZERO` waits indefinitely
    pub fn graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    /// Append a hook; hooks run in the order they were added
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Whether the run listens for Ctrl+C / SIGTERM
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Apply every setting of `config`
    pub fn config(mut self, config: AppConfig) -> Self {
        self.graceful_timeout = config.graceful_timeout();
        if let Some(name) = config.name {
            self.name = Some(name);
        }
        self.version = config.version;
        self.environment = config.environment;
        self.handle_signals = config.handle_signals;
        self
    }

    /// # Errors
    ///
    /// [`ConductorError::AppNameEmpty`] if a name was set to the empty string.
    pub fn build(self) -> Result<Application> {
        if self.name.as_deref() == Some("") {
            return Err(ConductorError::AppNameEmpty);
        }

        let registry = Arc::new(Registry::new());
        let meta = AppMeta {
            name: self.name.unwrap_or_default(),
            version: self.version,
            environment: self.environment,
            ..AppMeta::default()
        };

        Ok(Application {
            meta: RwLock::new(meta),
            runner: Runner::new(Arc::clone(&registry)),
            registry,
            hooks: self.hooks,
            running: AtomicBool::new(false),
            active: Mutex::new(None),
            graceful_timeout: self.graceful_timeout,
            handle_signals: self.handle_signals,
        })
    }
}
