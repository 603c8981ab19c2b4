//! Error types for logrow operations

use crate::ColumnRole;
use thiserror::Error;

/// Configuration errors. Raised while a column set, statement or sink is
/// being assembled, never while events are flowing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Column for role {role} must have a name")]
    MissingColumnName { role: ColumnRole },

    #[error("Custom column must have a name")]
    MissingCustomColumnName,

    #[error("Duplicate column name: {name}")]
    DuplicateColumn { name: String },

    #[error("Expected exactly one identity column, found {count}")]
    IdentityColumnCount { count: usize },

    #[error("Column {column} uses AUTO_INCREMENT but is not the identity column")]
    AutoIncrementOutsideIdentity { column: String },

    #[error("No insertable columns for table {table}")]
    NoInsertableColumns { table: String },

    #[error("Serializer not supported: {format}")]
    UnsupportedSerializer { format: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Statement expects {expected} parameters, got {got}")]
    ParameterCount { expected: usize, got: usize },
}

/// Raised when a value falls outside the closed kind/format tables.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnsupportedError {
    #[error("Column kind not supported: {kind}")]
    ColumnKind { kind: String },

    #[error("{kind} is not supported as a date-time format for column {column}")]
    DateTimeKind { column: String, kind: String },

    #[error("Level not supported: {level}")]
    Level { level: String },

    #[error("Placeholder style not supported: {style}")]
    PlaceholderStyle { style: String },
}

/// Master error type for all logrow errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogRowError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported: {0}")]
    Unsupported(#[from] UnsupportedError),

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Result type alias for logrow operations.
pub type LogRowResult<T> = Result<T, LogRowError>;

// =============================================================================
// TESTS
// =============================================================================
