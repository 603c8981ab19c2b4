//! Log sink orchestrator.
//!
//! A [`LogSink`] is built once from validated options and columns, optionally
//! creates its table, and then turns each [`LogEvent`] into one INSERT on one
//! freshly acquired connection. Connection and execution failures are logged
//! and counted, never raised from [`LogSink::emit`].

use crate::{
    ConnectionFactory, SinkConfig, SinkError, SinkMetrics, SinkMetricsSnapshot, SinkResult,
};
use logrow_core::{
    value_for, BoundStatement, ColumnSet, InsertStatement, LogEvent, PlaceholderStyle, SinkOptions,
};
use std::fmt;

// ============================================================================
// TABLE STATUS
// ============================================================================

/// Outcome of the one-time CREATE TABLE at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableStatus {
    /// Table creation disabled.
    Skipped,
    Ensured,
    /// The statement failed; the sink still accepts events.
    Failed,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Skipped => "skipped",
            TableStatus::Ensured => "ensured",
            TableStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SINK
// ============================================================================

/// Writes log events as rows of a single table.
///
/// Immutable after construction; share it behind an `Arc` to emit from many
/// tasks at once. Concurrent emits are independent and unordered.
pub struct LogSink<F> {
    factory: F,
    options: SinkOptions,
    columns: ColumnSet,
    insert: InsertStatement,
    table_status: TableStatus,
    metrics: SinkMetrics,
}

impl<F: ConnectionFactory> LogSink<F> {
    /// Validate the configuration, prepare the INSERT and, if enabled, run
    /// CREATE TABLE once.
    ///
    /// Configuration errors, including a placeholder style the factory's
    /// connections cannot bind, are logged and returned. A failed CREATE TABLE
    /// is logged and reported through [`LogSink::table_status`] only.
    pub async fn new(factory: F, options: SinkOptions, columns: ColumnSet) -> SinkResult<Self> {
        let (insert, create_table) = match prepare(&options, &columns, factory.placeholder_style())
        {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    table = %options.table_name,
                    "Invalid log sink configuration"
                );
                return Err(e);
            }
        };

        let table_status = match create_table {
            Some(sql) => ensure_table(&factory, &options.table_name, &sql).await,
            None => TableStatus::Skipped,
        };

        tracing::debug!(
            table = %options.table_name,
            columns = insert.columns().len(),
            table_status = %table_status,
            "Log sink ready"
        );

        Ok(Self {
            factory,
            options,
            columns,
            insert,
            table_status,
            metrics: SinkMetrics::new(),
        })
    }

    /// Build from a loaded [`SinkConfig`].
    pub async fn from_config(factory: F, config: &SinkConfig) -> SinkResult<Self> {
        let columns = match config.column_set() {
            Ok(columns) => columns,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    table = %config.sink.table_name,
                    "Invalid log sink column configuration"
                );
                return Err(e);
            }
        };
        Self::new(factory, config.sink.clone(), columns).await
    }

    /// Persist one event. Failures go to the diagnostic log and the metrics.
    pub async fn emit(&self, event: &LogEvent) {
        let _ = self.try_emit(event).await;
    }

    /// Persist one event and return the outcome. Failures are logged and
    /// counted exactly as in [`LogSink::emit`].
    pub async fn try_emit(&self, event: &LogEvent) -> SinkResult<()> {
        let statement = match self.bind_event(event) {
            Ok(statement) => statement,
            Err(e) => {
                self.metrics.record_extraction_failure();
                tracing::error!(
                    error = %e,
                    table = %self.options.table_name,
                    "Failed to extract log event values"
                );
                return Err(e);
            }
        };

        let mut connection = match self.factory.acquire().await {
            Ok(connection) => connection,
            Err(e) => {
                self.metrics.record_connection_failure();
                tracing::error!(
                    error = %e,
                    table = %self.options.table_name,
                    "Failed to acquire connection for log event"
                );
                return Err(e);
            }
        };

        let result = connection.execute(&statement).await;
        drop(connection);

        match result {
            Ok(_) => {
                self.metrics.record_emitted();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_execution_failure();
                tracing::error!(
                    error = %e,
                    table = %self.options.table_name,
                    "Failed to write log event"
                );
                Err(e)
            }
        }
    }

    /// INSERT for `event` with one value per insertable column.
    pub fn bind_event(&self, event: &LogEvent) -> SinkResult<BoundStatement<'_>> {
        let rendered = event.render_message();
        let values = self
            .columns
            .insertable()
            .map(|column| value_for(column, event, &rendered))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.insert.bind(values)?)
    }
}

impl<F> LogSink<F> {
    pub fn options(&self) -> &SinkOptions {
        &self.options
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn insert_statement(&self) -> &InsertStatement {
        &self.insert
    }

    pub fn table_status(&self) -> TableStatus {
        self.table_status
    }

    pub fn metrics(&self) -> SinkMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<F> fmt::Debug for LogSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("options", &self.options)
            .field("insert", &self.insert.sql())
            .field("table_status", &self.table_status)
            .finish_non_exhaustive()
    }
}

/// INSERT statement, plus CREATE TABLE when table creation is enabled.
fn prepare(
    options: &SinkOptions,
    columns: &ColumnSet,
    required_style: Option<PlaceholderStyle>,
) -> SinkResult<(InsertStatement, Option<String>)> {
    options.validate()?;
    if let Some(required) = required_style {
        if options.placeholders != required {
            return Err(SinkError::InvalidValue {
                field: "placeholders",
                reason: format!(
                    "connections require {} placeholders, configured {}",
                    required, options.placeholders
                ),
            });
        }
    }
    let insert = columns.insert_statement(&options.table_name, options.placeholders)?;
    let create_table = if options.create_table {
        Some(columns.create_table_statement(&options.table_name)?)
    } else {
        None
    };
    Ok((insert, create_table))
}

async fn ensure_table<F: ConnectionFactory>(factory: &F, table: &str, sql: &str) -> TableStatus {
    let outcome: Result<u64, SinkError> = async {
        let mut connection = factory.acquire().await?;
        connection.execute(&BoundStatement::plain(sql)).await
    }
    .await;

    match outcome {
        Ok(_) => {
            tracing::info!(table = %table, "Log table ensured");
            TableStatus::Ensured
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                table = %table,
                "Failed to create log table, continuing without it"
            );
            TableStatus::Failed
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingConnectionFactory;
    use chrono::DateTime;
    use logrow_core::{
        ColumnDescriptor, ColumnRole, ColumnValue, ConfigError, DataType, Level, LogRowError,
        PlaceholderStyle,
    };
    use std::io;
    use std::sync::{Arc, Mutex};

    fn event() -> LogEvent {
        LogEvent::new(
            DateTime::parse_from_rfc3339("2021-03-04T10:15:30.123456+02:00").unwrap(),
            Level::Information,
            "User {user} logged in",
        )
        .with_property("user", "alice")
        .with_property("region", "eu")
    }

    async fn default_sink(factory: &RecordingConnectionFactory) -> LogSink<RecordingConnectionFactory> {
        LogSink::new(factory.clone(), SinkOptions::default(), ColumnSet::default())
            .await
            .unwrap()
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    #[tokio::test]
    async fn test_construction_creates_table_once() {
        let factory = RecordingConnectionFactory::new();
        let sink = default_sink(&factory).await;

        assert_eq!(sink.table_status(), TableStatus::Ensured);
        let executed = factory.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0].sql,
            "CREATE TABLE IF NOT EXISTS Logs (Id INT NOT NULL AUTO_INCREMENT, \
             TimeStamp TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6), Event TEXT, Message TEXT, \
             Template TEXT, Level VARCHAR(16), Exception TEXT, PRIMARY KEY (Id))"
        );
        assert_eq!(factory.released_count(), 1);
    }

    #[tokio::test]
    async fn test_table_creation_disabled() {
        let factory = RecordingConnectionFactory::new();
        let options = SinkOptions::default().with_create_table(false);
        let sink = LogSink::new(factory.clone(), options, ColumnSet::default())
            .await
            .unwrap();
        assert_eq!(sink.table_status(), TableStatus::Skipped);
        assert_eq!(factory.acquired_count(), 0);
    }

    #[tokio::test]
    async fn test_table_creation_failure_is_logged_and_sink_ready() {
        let (logs, _guard) = capture_logs();
        let factory = RecordingConnectionFactory::new();
        factory.fail_next_executions(1);

        let sink = default_sink(&factory).await;
        assert_eq!(sink.table_status(), TableStatus::Failed);
        assert!(logs.contents().contains("Failed to create log table"));

        sink.emit(&event()).await;
        assert_eq!(factory.inserts().len(), 1);
    }

    #[tokio::test]
    async fn test_acquire_failure_during_table_creation() {
        let factory = RecordingConnectionFactory::new();
        factory.fail_next_acquires(1);
        let sink = default_sink(&factory).await;
        assert_eq!(sink.table_status(), TableStatus::Failed);
    }

    #[tokio::test]
    async fn test_emit_binds_one_value_per_insertable_column() {
        let factory = RecordingConnectionFactory::new();
        let sink = default_sink(&factory).await;
        sink.emit(&event().with_exception("boom")).await;

        let inserts = factory.inserts();
        assert_eq!(inserts.len(), 1);
        let insert = &inserts[0];
        assert_eq!(
            insert.sql,
            "INSERT INTO Logs (TimeStamp, Event, Message, Template, Level, Exception) \
             VALUES (@TimeStamp, @Event, @Message, @Template, @Level, @Exception)"
        );
        let names: Vec<&str> = insert.parameters.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, sink.insert_statement().columns());
        assert_eq!(
            insert.value("TimeStamp"),
            Some(&ColumnValue::from("2021-03-04 10:15:30.123456"))
        );
        assert_eq!(
            insert.value("Event"),
            Some(&ColumnValue::from(r#"{"user":"alice","region":"eu"}"#))
        );
        assert_eq!(
            insert.value("Message"),
            Some(&ColumnValue::from("User \"alice\" logged in"))
        );
        assert_eq!(
            insert.value("Template"),
            Some(&ColumnValue::from("User {user} logged in"))
        );
        assert_eq!(insert.value("Level"), Some(&ColumnValue::from("Information")));
        assert_eq!(insert.value("Exception"), Some(&ColumnValue::from("boom")));
        assert_eq!(insert.value("Id"), None);

        assert_eq!(sink.metrics().events_emitted, 1);
        assert_eq!(factory.acquired_count(), factory.released_count());
    }

    #[tokio::test]
    async fn test_custom_columns_and_positional_placeholders() {
        let factory = RecordingConnectionFactory::new();
        let columns = ColumnSet::builder()
            .with(ColumnDescriptor::guid_id("Id"))
            .exclude(ColumnRole::LogEvent)
            .with(ColumnDescriptor::custom("Region", DataType::varchar(8)))
            .with(ColumnDescriptor::custom("App", DataType::text()).with_value("billing"))
            .with(ColumnDescriptor::custom("Zone", DataType::text()))
            .build()
            .unwrap();
        let options = SinkOptions::new("AppLogs").with_placeholders(PlaceholderStyle::Positional);
        let sink = LogSink::new(factory.clone(), options, columns).await.unwrap();

        sink.emit(&event()).await;
        let insert = &factory.inserts()[0];
        assert!(insert.sql.ends_with("VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"));
        assert_eq!(insert.style, PlaceholderStyle::Positional);
        assert_eq!(insert.value("Id").and_then(|v| v.as_text()).map(str::len), Some(36));
        assert_eq!(insert.value("Region"), Some(&ColumnValue::from("eu")));
        assert_eq!(insert.value("App"), Some(&ColumnValue::from("billing")));
        assert_eq!(insert.value("Zone"), Some(&ColumnValue::from("NULL")));
    }

    #[tokio::test]
    async fn test_transient_failures_are_swallowed_and_counted() {
        let (logs, _guard) = capture_logs();
        let factory = RecordingConnectionFactory::new();
        let sink = default_sink(&factory).await;

        factory.fail_next_acquires(1);
        sink.emit(&event()).await;
        factory.fail_next_executions(1);
        sink.emit(&event()).await;
        sink.emit(&event()).await;

        let metrics = sink.metrics();
        assert_eq!(metrics.events_emitted, 1);
        assert_eq!(metrics.events_failed, 2);
        assert_eq!(metrics.connection_failures, 1);
        assert_eq!(metrics.execution_failures, 1);
        assert_eq!(factory.inserts().len(), 1);
        assert_eq!(factory.acquired_count(), factory.released_count());

        let output = logs.contents();
        assert!(output.contains("Failed to acquire connection for log event"));
        assert!(output.contains("Failed to write log event"));
    }

    #[tokio::test]
    async fn test_try_emit_reports_outcome() {
        let factory = RecordingConnectionFactory::new();
        let sink = default_sink(&factory).await;

        assert!(sink.try_emit(&event()).await.is_ok());
        factory.fail_next_acquires(1);
        let err = sink.try_emit(&event()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_identity_is_config_error() {
        let (logs, _guard) = capture_logs();
        let factory = RecordingConnectionFactory::new();
        let columns = ColumnSet::builder().exclude(ColumnRole::Id).build().unwrap();

        let err = LogSink::new(factory.clone(), SinkOptions::default(), columns.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SinkError::Core(LogRowError::Config(ConfigError::IdentityColumnCount { count: 0 }))
        ));
        assert!(logs.contents().contains("Invalid log sink configuration"));
        assert_eq!(factory.acquired_count(), 0);

        // Without table creation no identity column is required.
        let options = SinkOptions::default().with_create_table(false);
        assert!(LogSink::new(factory, options, columns).await.is_ok());
    }

    #[tokio::test]
    async fn test_placeholder_style_must_match_factory() {
        let (logs, _guard) = capture_logs();
        let factory = RecordingConnectionFactory::requiring(PlaceholderStyle::Positional);

        let err = LogSink::new(factory.clone(), SinkOptions::default(), ColumnSet::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SinkError::InvalidValue {
                field: "placeholders",
                ..
            }
        ));
        assert!(!err.is_transient());
        assert!(logs.contents().contains("Invalid log sink configuration"));
        assert_eq!(factory.acquired_count(), 0);

        let options = SinkOptions::default().with_placeholders(PlaceholderStyle::Positional);
        let sink = LogSink::new(factory.clone(), options, ColumnSet::default())
            .await
            .unwrap();
        assert_eq!(sink.table_status(), TableStatus::Ensured);
        sink.emit(&event()).await;
        assert_eq!(factory.inserts().len(), 1);
        assert_eq!(sink.metrics().execution_failures, 0);
    }

    #[tokio::test]
    async fn test_blank_table_name_rejected() {
        let factory = RecordingConnectionFactory::new();
        let result = LogSink::new(factory, SinkOptions::new(""), ColumnSet::default()).await;
        assert!(matches!(
            result,
            Err(SinkError::Core(LogRowError::Config(ConfigError::InvalidValue { .. })))
        ));
    }

    #[tokio::test]
    async fn test_from_config() {
        let factory = RecordingConnectionFactory::new();
        let config = SinkConfig::from_toml_str(
            "[sink]\ntable_name = \"Audit\"\n\n[columns.exception]\nexclude = true\n",
        )
        .unwrap();
        let sink = LogSink::from_config(factory.clone(), &config).await.unwrap();
        assert_eq!(sink.options().table_name, "Audit");
        assert_eq!(sink.columns().len(), 6);
        assert!(factory.executed()[0].sql.starts_with("CREATE TABLE IF NOT EXISTS Audit ("));
    }
}
