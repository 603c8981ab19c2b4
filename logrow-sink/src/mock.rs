//! In-memory connection factory for tests.
//!
//! Records every executed statement instead of talking to a database, and can
//! be told to fail the next N acquisitions or executions, or to demand one
//! placeholder style the way a positional-only driver does.

use crate::{ConnectionFactory, SinkError, SinkResult, SqlConnection};
use ::async_trait::async_trait;
use logrow_core::{BoundStatement, ColumnValue, PlaceholderStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Statement captured by [`RecordingConnectionFactory`], owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub style: PlaceholderStyle,
    pub parameters: Vec<(String, ColumnValue)>,
}

impl ExecutedStatement {
    pub fn is_insert(&self) -> bool {
        self.sql.starts_with("INSERT")
    }

    pub fn is_create_table(&self) -> bool {
        self.sql.starts_with("CREATE TABLE")
    }

    /// Value bound for `column`, if the statement has that parameter.
    pub fn value(&self, column: &str) -> Option<&ColumnValue> {
        self.parameters
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Default)]
struct Recorder {
    executed: Mutex<Vec<ExecutedStatement>>,
    failing_acquires: AtomicUsize,
    failing_executions: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    required_style: Option<PlaceholderStyle>,
}

impl Recorder {
    fn executed(&self) -> MutexGuard<'_, Vec<ExecutedStatement>> {
        self.executed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrement a pending-failure counter; true if a failure was consumed.
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Cloneable handle; clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnectionFactory {
    recorder: Arc<Recorder>,
}

impl RecordingConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose connections reject parameterized statements in any
    /// other style.
    pub fn requiring(style: PlaceholderStyle) -> Self {
        Self {
            recorder: Arc::new(Recorder {
                required_style: Some(style),
                ..Recorder::default()
            }),
        }
    }

    /// Fail the next `count` calls to `acquire`.
    pub fn fail_next_acquires(&self, count: usize) {
        self.recorder.failing_acquires.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` executed statements, DDL included.
    pub fn fail_next_executions(&self, count: usize) {
        self.recorder.failing_executions.store(count, Ordering::SeqCst);
    }

    /// Every statement executed successfully, in order.
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.recorder.executed().clone()
    }

    pub fn inserts(&self) -> Vec<ExecutedStatement> {
        self.recorder
            .executed()
            .iter()
            .filter(|s| s.is_insert())
            .cloned()
            .collect()
    }

    pub fn acquired_count(&self) -> usize {
        self.recorder.acquired.load(Ordering::SeqCst)
    }

    /// Connections dropped so far.
    pub fn released_count(&self) -> usize {
        self.recorder.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for RecordingConnectionFactory {
    async fn acquire(&self) -> SinkResult<Box<dyn SqlConnection>> {
        if take_failure(&self.recorder.failing_acquires) {
            return Err(SinkError::connection("injected acquire failure"));
        }
        self.recorder.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingConnection {
            recorder: Arc::clone(&self.recorder),
        }))
    }

    fn placeholder_style(&self) -> Option<PlaceholderStyle> {
        self.recorder.required_style
    }
}

struct RecordingConnection {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl SqlConnection for RecordingConnection {
    async fn execute(&mut self, statement: &BoundStatement<'_>) -> SinkResult<u64> {
        if take_failure(&self.recorder.failing_executions) {
            return Err(SinkError::execution("injected execution failure"));
        }
        if let Some(required) = self.recorder.required_style {
            if statement.style != required && !statement.parameters.is_empty() {
                return Err(SinkError::execution(format!(
                    "{} placeholders required, got {}",
                    required, statement.style
                )));
            }
        }
        let recorded = ExecutedStatement {
            sql: statement.sql.to_string(),
            style: statement.style,
            parameters: statement
                .parameters
                .iter()
                .map(|p| (p.column.to_string(), p.value.clone()))
                .collect(),
        };
        self.recorder.executed().push(recorded);
        Ok(if statement.parameters.is_empty() { 0 } else { 1 })
    }
}

impl Drop for RecordingConnection {
    fn drop(&mut self) {
        self.recorder.released.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// TESTS
// =============================================================================
