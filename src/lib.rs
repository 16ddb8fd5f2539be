//! # Conductor
//!
//! An async lifecycle coordinator for long-running Rust services.
//!
//! Conductor owns an ordered set of independently implemented modules and
//! drives them through init → start → run → stop with deterministic
//! ordering, unwinding partial failures safely.
//!
//! ## Features
//!
//! - **Ordered lifecycle**: modules start in registration order and stop in reverse
//! - **Rollback**: a failed start stops everything that already started
//! - **Background failures**: long-running modules can end the run by reporting a failure
//! - **Bounded shutdown**: stop calls race a configurable graceful timeout
//! - **Hooks**: callbacks around start and stop, independent of any module
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conductor::prelude::*;
//! use std::time::Duration;
//!
//! struct Worker;
//!
//! #[async_trait]
//! impl Module for Worker {
//!     fn name(&self) -> &str {
//!         "worker"
//!     }
//!
//!     async fn init(&self, _ctx: &RunContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!
//!     async fn start(&self, ctx: &RunContext) -> anyhow::Result<()> {
//!         let ctx = ctx.clone();
//!         tokio::spawn(async move {
//!             ctx.cancelled().await;
//!             tracing::info!("worker winding down");
//!         });
//!         Ok(())
//!     }
//!
//!     async fn stop(&self, _ctx: &RunContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> conductor::Result<()> {
//!     let app = Application::builder()
//!         .name("jobs")
//!         .graceful_timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     app.register(Worker)?;
//!     app.run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod module;

// Re-export core types
pub use config::{AppConfig, ConfigService};
pub use error::{ConductorError, Result};
pub use lifecycle::{
    AppMeta, Application, ApplicationBuilder, Hook, HookBoundary, Phase, RunContext,
};
pub use module::{BackgroundModule, FailureSignal, HealthCheck, Module};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
///
/// ```
/// use conductor::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{AppConfig, ConfigService};
    pub use crate::error::{ConductorError, Result};
    pub use crate::lifecycle::{
        AppMeta, Application, ApplicationBuilder, Hook, HookBoundary, Phase, RunContext,
        shutdown_signal,
    };
    pub use crate::module::{BackgroundModule, FailureSignal, HealthCheck, Module};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}
