//! LOGROW Sink - SQL Table Log Sink
//!
//! Drives a [`ConnectionFactory`] with the statements and values produced by
//! `logrow-core`: one CREATE TABLE at construction, one INSERT per event.
//! Transient database failures are logged through `tracing` and counted in
//! [`SinkMetrics`]; they never reach the caller of [`LogSink::emit`].

pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod mock;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sink;

pub use config::{
    DbConfig, SinkConfig, ENV_CREATE_TABLE, ENV_DB_POOL_SIZE, ENV_DB_TIMEOUT, ENV_DB_URL,
    ENV_PLACEHOLDERS, ENV_TABLE_NAME,
};
pub use connection::{ConnectionFactory, SqlConnection};
pub use error::{SinkError, SinkResult};
pub use metrics::{SinkMetrics, SinkMetricsSnapshot};
pub use mock::{ExecutedStatement, RecordingConnectionFactory};
#[cfg(feature = "mysql")]
pub use mysql::MySqlConnectionFactory;
pub use sink::{LogSink, TableStatus};

// Re-export the core model so a single dependency suffices.
pub use logrow_core::{
    ColumnDescriptor, ColumnKind, ColumnRole, ColumnSet, ColumnValue, DataType, Level, LogEvent,
    PlaceholderStyle, PropertyValue, SinkOptions,
};
