//! Application metadata and the per-run context handed to modules and hooks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Identity and timing of the application.
///
/// Start time is stamped once per run, stop time once per shutdown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppMeta {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) environment: String,
    pub(crate) start_time: Option<DateTime<Utc>>,
    pub(crate) stop_time: Option<DateTime<Utc>>,
}

impl AppMeta {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop_time
    }

    /// Time between start and stop, or start and now while running.
    ///
    /// Zero if the application has never been started.
    pub fn uptime(&self) -> Duration {
        let Some(start) = self.start_time else {
            return Duration::ZERO;
        };
        let end = self.stop_time.unwrap_or_else(Utc::now);
        (end - start).to_std().unwrap_or_default()
    }

    pub(crate) fn mark_started(&mut self) {
        self.start_time = Some(Utc::now());
        self.stop_time = None;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.stop_time = Some(Utc::now());
    }
}

/// Context passed to every phase call and hook.
///
/// Carries a read-only snapshot of the application metadata together with
/// the cancellation token of the phase it was created for. During the
/// running phase the token fires when shutdown is requested; during
/// shutdown it fires when the graceful timeout expires.
#[derive(Debug, Clone)]
pub struct RunContext {
    meta: Arc<AppMeta>,
    token: CancellationToken,
}

impl RunContext {
    pub fn new(meta: Arc<AppMeta>, token: CancellationToken) -> Self {
        Self { meta, token }
    }

    pub fn meta(&self) -> &AppMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn version(&self) -> &str {
        self.meta.version()
    }

    pub fn environment(&self) -> &str {
        self.meta.environment()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.meta.start_time()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once this context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Same metadata, fresh token not linked to this one.
    pub(crate) fn detached(&self) -> Self {
        Self {
            meta: Arc::clone(&self.meta),
            token: CancellationToken::new(),
        }
    }
}
