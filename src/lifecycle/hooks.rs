//! Cross-cutting callbacks run at the four lifecycle boundaries.

use super::RunContext;
use crate::error::{ConductorError, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};

type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type HookFn = Arc<dyn Fn(RunContext) -> HookFuture + Send + Sync>;

/// Lifecycle boundary a hook callback is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum HookBoundary {
    BeforeStart,
    AfterStart,
    BeforeStop,
    AfterStop,
}

/// A set of optional callbacks, one per [`HookBoundary`].
///
/// Unset callbacks are no-ops. Hooks registered on the same application run
/// in registration order for every boundary.
///
/// # Example
///
/// ```rust,ignore
/// let hook = Hook::new()
///     .after_start(|ctx| async move {
///         tracing::info!(app = ctx.name(), "ready");
///         Ok(())
///     })
///     .before_stop(|_ctx| async { drain_connections().await });
/// ```
#[derive(Clone, Default)]
pub struct Hook {
    before_start: Option<HookFn>,
    after_start: Option<HookFn>,
    before_stop: Option<HookFn>,
    after_stop: Option<HookFn>,
}

fn boxed<F, Fut>(callback: F) -> HookFn
where
    F: Fn(RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: RunContext| Box::pin(callback(ctx)) as HookFuture)
}

impl Hook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs after every module initialized, before any module starts
    pub fn before_start<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.before_start = Some(boxed(callback));
        self
    }

    /// Runs once every module started
    pub fn after_start<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_start = Some(boxed(callback));
        self
    }

    /// Runs when shutdown begins, before any module stops
    pub fn before_stop<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.before_stop = Some(boxed(callback));
        self
    }

    /// Runs after the stop phase resolved, including on timeout
    pub fn after_stop<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_stop = Some(boxed(callback));
        self
    }

    fn callback(&self, boundary: HookBoundary) -> Option<&HookFn> {
        match boundary {
            HookBoundary::BeforeStart => self.before_start.as_ref(),
            HookBoundary::AfterStart => self.after_start.as_ref(),
            HookBoundary::BeforeStop => self.before_stop.as_ref(),
            HookBoundary::AfterStop => self.after_stop.as_ref(),
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("before_start", &self.before_start.is_some())
            .field("after_start", &self.after_start.is_some())
            .field("before_stop", &self.before_stop.is_some())
            .field("after_stop", &self.after_stop.is_some())
            .finish()
    }
}

/// Run the `boundary` callback of every hook in order.
///
/// Stops at the first failure; callers decide whether that aborts the run or
/// is only logged.
pub(crate) async fn run_hooks(
    hooks: &[Hook],
    boundary: HookBoundary,
    ctx: &RunContext,
) -> Result<()> {
    for (index, hook) in hooks.iter().enumerate() {
        let Some(callback) = hook.callback(boundary) else {
            continue;
        };

        tracing::debug!(%boundary, index, "running hook");
        callback(ctx.clone()).await.map_err(|source| {
            tracing::error!(%boundary, index, error = %source, "hook failed");
            ConductorError::Hook { boundary, source }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::AppMeta;
    use std::sync::Mutex;
    use strum::IntoEnumIterator;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> RunContext {
        RunContext::new(Arc::new(AppMeta::default()), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_unset_boundaries_are_noops() {
        let hooks = vec![Hook::new().after_start(|_| async { Ok(()) })];

        for boundary in HookBoundary::iter() {
            run_hooks(&hooks, boundary, &ctx()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let hooks: Vec<Hook> = (0..3)
            .map(|id| {
                let order = Arc::clone(&order);
                Hook::new().before_start(move |_| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(id);
                        Ok(())
                    }
                })
            })
            .collect();

        run_hooks(&hooks, HookBoundary::BeforeStart, &ctx())
            .await
            .unwrap();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_chain() {
        let calls = Arc::new(Mutex::new(0));
        let counted = Arc::clone(&calls);

        let hooks = vec![
            Hook::new().after_stop(|_| async { Err(anyhow::anyhow!("flush failed")) }),
            Hook::new().after_stop(move |_| {
                let counted = Arc::clone(&counted);
                async move {
                    *counted.lock().unwrap() += 1;
                    Ok(())
                }
            }),
        ];

        let err = run_hooks(&hooks, HookBoundary::AfterStop, &ctx())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConductorError::Hook {
                boundary: HookBoundary::AfterStop,
                ..
            }
        ));
        assert_eq!(err.to_string(), "after_stop hook: flush failed");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_debug_reports_set_callbacks() {
        let hook = Hook::new().before_stop(|_| async { Ok(()) });
        let rendered = format!("{hook:?}");
        assert!(rendered.contains("before_stop: true"));
        assert!(rendered.contains("after_start: false"));
    }
}
