//! The contract every coordinated component implements.

mod signal;

pub use signal::FailureSignal;

use crate::lifecycle::RunContext;
use async_trait::async_trait;
use std::fmt;

/// A component driven through init → start → stop by the application.
///
/// The name identifies the module inside a registry; it must be non-empty,
/// unique, and stable for the module's lifetime. Each phase method is called
/// at most once per run.
///
/// Optional capabilities are advertised through [`Module::as_background`]
/// and [`Module::as_health_check`], which return `None` unless overridden.
///
/// # Example
///
/// ```rust,ignore
/// use conductor::prelude::*;
///
/// struct Database {
///     pool: PgPool,
/// }
///
/// #[async_trait]
/// impl Module for Database {
///     fn name(&self) -> &str {
///         "database"
///     }
///
///     async fn init(&self, ctx: &RunContext) -> anyhow::Result<()> {
///         tracing::info!(app = ctx.name(), "connecting");
///         self.pool.connect().await
///     }
///
///     async fn start(&self, _ctx: &RunContext) -> anyhow::Result<()> {
///         Ok(())
///     }
///
///     async fn stop(&self, _ctx: &RunContext) -> anyhow::Result<()> {
///         self.pool.close().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Prepare resources. Called in registration order before any module
    /// starts; a failure aborts the run without stopping anything.
    async fn init(&self, ctx: &RunContext) -> anyhow::Result<()>;

    /// Begin operation. Long-lived work should watch `ctx` for cancellation.
    async fn start(&self, ctx: &RunContext) -> anyhow::Result<()>;

    /// Release resources. Called in reverse registration order, either at
    /// shutdown or to roll back a failed start. `ctx` is cancelled when the
    /// graceful shutdown window runs out.
    async fn stop(&self, ctx: &RunContext) -> anyhow::Result<()>;

    fn as_background(&self) -> Option<&dyn BackgroundModule> {
        None
    }

    fn as_health_check(&self) -> Option<&dyn HealthCheck> {
        None
    }
}

impl fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("name", &self.name()).finish()
    }
}

/// A module whose work continues after `start` returns and can fail later.
#[async_trait]
pub trait BackgroundModule: Send + Sync {
    /// Resolves with `Some(error)` when the background work fails, or `None`
    /// once it has exited cleanly. Must resolve eventually; a module that
    /// never resolves is treated as healthy.
    async fn failure(&self) -> Option<anyhow::Error>;
}

/// A module that can report its own liveness.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// `ctx` is cancelled when the caller gives up on the check; a check
    /// still pending at that point is reported as failed.
    async fn health(&self, ctx: &RunContext) -> anyhow::Result<()>;
}
