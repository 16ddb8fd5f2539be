//! Lifecycle Module
//!
//! Drives registered modules through their lifecycle and unwinds partial
//! failures.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Module Registration          (registry open)
//!    ↓
//! 2. Run                          (registry locked, start time stamped)
//!    ↓
//! 3. Init (each module, in order)
//!    ↓
//! 4. BeforeStart hooks
//!    ↓
//! 5. Start (each module, in order)   ── failure → stop started modules in reverse
//!    ↓
//! 6. AfterStart hooks                ── failure → stop started modules in reverse
//!    ↓
//! [Running...]  until Ctrl+C / SIGTERM, Application::stop, or a background failure
//!    ↓
//! 7. BeforeStop hooks
//!    ↓
//! 8. Stop (each module, reverse order, within the graceful timeout)
//!    ↓
//! 9. AfterStop hooks
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use conductor::prelude::*;
//!
//! struct Cache;
//!
//! #[async_trait]
//! impl Module for Cache {
//!     fn name(&self) -> &str {
//!         "cache"
//!     }
//!
//!     async fn init(&self, ctx: &RunContext) -> anyhow::Result<()> {
//!         tracing::info!(env = ctx.environment(), "warming cache");
//!         Ok(())
//!     }
//!
//!     async fn start(&self, _ctx: &RunContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!
//!     async fn stop(&self, _ctx: &RunContext) -> anyhow::Result<()> {
//!         tracing::info!("flushing cache");
//!         Ok(())
//!     }
//! }
//!
//! let app = Application::builder().name("api").build()?;
//! app.register(Cache)?;
//! app.run().await?;
//! ```

mod application;
mod background;
mod context;
mod hooks;
mod registry;
mod runner;
mod shutdown;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{Application, ApplicationBuilder};
pub use background::{BackgroundErrors, collect as collect_background_errors};
pub use context::{AppMeta, RunContext};
pub use hooks::{Hook, HookBoundary};
pub use registry::Registry;
pub use runner::{Phase, Runner, RunnerState};
pub use shutdown::shutdown_signal;
