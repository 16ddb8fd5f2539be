use crate::lifecycle::{HookBoundary, Phase};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConductorError>;

/// Errors surfaced by the registry, the runner and the application.
///
/// Stop failures and late hook failures are collected rather than
/// short-circuited, so several errors may be reported at once through
/// [`ConductorError::Multiple`]. Use [`ConductorError::errors`] to look at
/// the individual failures regardless of how they were joined.
#[derive(Debug, Error)]
pub enum ConductorError {
    #[error("application is already running")]
    AlreadyRunning,

    #[error("application is already stopped")]
    AlreadyStopped,

    #[error("registration is closed: application already started")]
    RegistrationClosed,

    #[error("module already registered: {name}")]
    DuplicateName { name: String },

    #[error("module name must not be empty")]
    NameEmpty,

    #[error("application name must not be empty")]
    AppNameEmpty,

    #[error("graceful shutdown timed out after {timeout:?}")]
    GracefulShutdownTimedOut { timeout: Duration },

    /// A module failed inside one of its lifecycle phases
    #[error("{phase} module {module:?}: {source}")]
    ModulePhase {
        module: String,
        phase: Phase,
        source: anyhow::Error,
    },

    /// A hook callback failed at a lifecycle boundary
    #[error("{boundary} hook: {source}")]
    Hook {
        boundary: HookBoundary,
        source: anyhow::Error,
    },

    /// A background module reported a failure while the application was running
    #[error("background module {module:?}: {source}")]
    Background {
        module: String,
        source: anyhow::Error,
    },

    #[error("module {module:?} unhealthy: {source}")]
    Health {
        module: String,
        source: anyhow::Error,
    },

    #[error("invalid configuration for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("shutdown task failed: {0}")]
    ShutdownTask(#[from] tokio::task::JoinError),

    #[error("{}", display_joined(.0))]
    Multiple(Vec<ConductorError>),
}

fn display_joined(errors: &[ConductorError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConductorError {
    pub fn module_phase(module: impl Into<String>, phase: Phase, source: anyhow::Error) -> Self {
        Self::ModulePhase {
            module: module.into(),
            phase,
            source,
        }
    }

    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Join any number of errors into one.
    ///
    /// Returns `None` for an empty input and the error itself when there is
    /// exactly one. Nested joins are flattened.
    pub fn join<I>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = ConductorError>,
    {
        let mut flat: Vec<_> = errors.into_iter().flat_map(Self::into_errors).collect();
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::Multiple(flat)),
        }
    }

    /// Join `other` onto this error without discarding either.
    pub fn and(self, other: ConductorError) -> Self {
        let mut flat = self.into_errors();
        flat.extend(other.into_errors());
        Self::Multiple(flat)
    }

    /// The individual failures carried by this error.
    pub fn errors(&self) -> Vec<&ConductorError> {
        match self {
            Self::Multiple(inner) => inner.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    pub fn into_errors(self) -> Vec<ConductorError> {
        match self {
            Self::Multiple(inner) => inner.into_iter().flat_map(Self::into_errors).collect(),
            other => vec![other],
        }
    }

    /// Whether any of the joined failures satisfies `predicate`.
    pub fn contains(&self, predicate: impl Fn(&ConductorError) -> bool) -> bool {
        self.errors().into_iter().any(predicate)
    }

    pub fn is_timeout(&self) -> bool {
        self.contains(|e| matches!(e, Self::GracefulShutdownTimedOut { .. }))
    }

    /// Name of the module this failure belongs to, if any.
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::ModulePhase { module, .. }
            | Self::Background { module, .. }
            | Self::Health { module, .. }
            | Self::DuplicateName { name: module } => Some(module.as_str()),
            _ => None,
        }
    }
}

/// Collapse a batch of results into one, keeping every failure.
pub(crate) fn merge<I>(results: I) -> Result<()>
where
    I: IntoIterator<Item = Result<()>>,
{
    match ConductorError::join(results.into_iter().filter_map(|r| r.err())) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_empty_is_none() {
        assert!(ConductorError::join(Vec::new()).is_none());
    }

    #[test]
    fn test_join_single_keeps_kind() {
        let err = ConductorError::join([ConductorError::NameEmpty]).unwrap();
        assert!(matches!(err, ConductorError::NameEmpty));
    }

    #[test]
    fn test_join_flattens_nested() {
        let inner = ConductorError::AlreadyRunning.and(ConductorError::NameEmpty);
        let err = ConductorError::join([inner, ConductorError::RegistrationClosed]).unwrap();

        assert_eq!(err.errors().len(), 3);
        assert!(err.contains(|e| matches!(e, ConductorError::RegistrationClosed)));
        assert_eq!(
            err.to_string(),
            "application is already running; module name must not be empty; \
             registration is closed: application already started"
        );
    }

    #[test]
    fn test_module_phase_display() {
        let err = ConductorError::module_phase("db", Phase::Start, anyhow::anyhow!("refused"));
        assert_eq!(err.to_string(), "start module \"db\": refused");
        assert_eq!(err.module(), Some("db"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_merge_keeps_all_failures() {
        let merged = merge([
            Ok(()),
            Err(ConductorError::AlreadyStopped),
            Err(ConductorError::GracefulShutdownTimedOut {
                timeout: Duration::from_millis(10),
            }),
        ])
        .unwrap_err();

        assert_eq!(merged.errors().len(), 2);
        assert!(merged.is_timeout());
        assert!(merge([Ok(()), Ok(())]).is_ok());
    }
}
