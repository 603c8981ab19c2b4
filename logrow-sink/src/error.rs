//! Error types for sink construction, configuration loading and I/O.

use logrow_core::{ConfigError, LogRowError};
use thiserror::Error;

/// Errors surfaced by the sink crate.
///
/// Connection and execution failures are transient: the sink logs them and
/// keeps running. Everything else is raised while the sink is being built.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to acquire connection: {reason}")]
    Connection { reason: String },

    #[error("Statement execution failed: {reason}")]
    Execution { reason: String },

    #[error(transparent)]
    Core(#[from] LogRowError),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl SinkError {
    pub fn connection(reason: impl Into<String>) -> Self {
        SinkError::Connection {
            reason: reason.into(),
        }
    }

    pub fn execution(reason: impl Into<String>) -> Self {
        SinkError::Execution {
            reason: reason.into(),
        }
    }

    /// Connection or execution failure, as opposed to a configuration fault.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SinkError::Connection { .. } | SinkError::Execution { .. }
        )
    }
}

impl From<ConfigError> for SinkError {
    fn from(err: ConfigError) -> Self {
        SinkError::Core(err.into())
    }
}

/// Result type alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use logrow_core::UnsupportedError;

    #[test]
    fn test_transient_classification() {
        assert!(SinkError::connection("pool exhausted").is_transient());
        assert!(SinkError::execution("deadlock").is_transient());
        let config: SinkError = ConfigError::IdentityColumnCount { count: 0 }.into();
        assert!(!config.is_transient());
    }

    #[test]
    fn test_core_errors_display_transparently() {
        let err: SinkError = LogRowError::from(UnsupportedError::ColumnKind {
            kind: "money".to_string(),
        })
        .into();
        assert_eq!(err.to_string(), "Unsupported: Column kind not supported: money");
    }

    #[test]
    fn test_connection_display() {
        let err = SinkError::connection("refused");
        assert_eq!(err.to_string(), "Failed to acquire connection: refused");
    }
}
