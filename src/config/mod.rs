//! Application configuration
//!
//! [`AppConfig`] carries the settings an [`ApplicationBuilder`] needs. It can
//! be deserialized from any serde format or read from `CONDUCTOR_*`
//! environment variables through [`ConfigService`].
//!
//! [`ApplicationBuilder`]: crate::lifecycle::ApplicationBuilder

use crate::error::{ConductorError, Result};
use dashmap::DashMap;
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CONDUCTOR_";

pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings applied by [`ApplicationBuilder::config`](crate::lifecycle::ApplicationBuilder::config)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: Option<String>,
    pub version: String,
    pub environment: String,
    /// Graceful shutdown window in milliseconds; `0` waits indefinitely
    pub graceful_timeout_ms: u64,
    pub handle_signals: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: None,
            version: String::new(),
            environment: String::new(),
            graceful_timeout_ms: DEFAULT_GRACEFUL_TIMEOUT.as_millis() as u64,
            handle_signals: true,
        }
    }
}

impl AppConfig {
    /// Read the configuration from `CONDUCTOR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        ConfigService::from_env().app_config()
    }

    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_timeout_ms)
    }
}

/// Key/value configuration source
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every `CONDUCTOR_*` environment variable.
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)) {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    fn parsed<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        parse(raw.trim())
            .map(Some)
            .ok_or_else(|| ConductorError::invalid_config(key, format!("unparseable value {raw:?}")))
    }

    /// Build an [`AppConfig`], falling back to defaults for unset keys.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::default();

        if let Some(name) = self.get("CONDUCTOR_NAME") {
            config.name = Some(name);
        }
        if let Some(version) = self.get("CONDUCTOR_VERSION") {
            config.version = version;
        }
        if let Some(environment) = self.get("CONDUCTOR_ENV") {
            config.environment = environment;
        }
        if let Some(ms) = self.parsed("CONDUCTOR_GRACEFUL_TIMEOUT_MS", |v| v.parse::<u64>().ok())? {
            config.graceful_timeout_ms = ms;
        }
        if let Some(handle) = self.parsed("CONDUCTOR_HANDLE_SIGNALS", parse_bool)? {
            config.handle_signals = handle;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigService::new().app_config().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.graceful_timeout(), Duration::from_secs(10));
        assert!(config.handle_signals);
    }

    #[test]
    fn test_reads_all_keys() {
        let service = ConfigService::new();
        service.set("CONDUCTOR_NAME", "ledger");
        service.set("CONDUCTOR_VERSION", "3.1.0");
        service.set("CONDUCTOR_ENV", "prod");
        service.set("CONDUCTOR_GRACEFUL_TIMEOUT_MS", " 0 ");
        service.set("CONDUCTOR_HANDLE_SIGNALS", "off");

        let config = service.app_config().unwrap();
        assert_eq!(config.name.as_deref(), Some("ledger"));
        assert_eq!(config.version, "3.1.0");
        assert_eq!(config.environment, "prod");
        assert_eq!(config.graceful_timeout(), Duration::ZERO);
        assert!(!config.handle_signals);
    }

    #[test]
    fn test_rejects_negative_timeout() {
        let service = ConfigService::new();
        service.set("CONDUCTOR_GRACEFUL_TIMEOUT_MS", "-1000");

        let err = service.app_config().unwrap_err();
        assert!(matches!(
            err,
            ConductorError::InvalidConfig { ref key, .. } if key == "CONDUCTOR_GRACEFUL_TIMEOUT_MS"
        ));
    }

    #[test]
    fn test_rejects_bad_bool() {
        let service = ConfigService::new();
        service.set("CONDUCTOR_HANDLE_SIGNALS", "maybe");
        assert!(service.app_config().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig =
            serde_json::from_str(r#"{"name": "ledger", "graceful_timeout_ms": 250}"#).unwrap();

        assert_eq!(config.name.as_deref(), Some("ledger"));
        assert_eq!(config.graceful_timeout(), Duration::from_millis(250));
        assert!(config.handle_signals);
        assert!(config.version.is_empty());
    }
}
