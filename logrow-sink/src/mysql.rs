//! MySQL connection factory over an `sqlx` pool.
//!
//! sqlx binds MySQL parameters by position, so statements executed here must
//! use [`PlaceholderStyle::Positional`]. The factory reports that requirement
//! and [`crate::LogSink::new`] rejects other styles up front. Parameterless
//! DDL is accepted in any style.

use crate::{ConnectionFactory, DbConfig, SinkError, SinkResult, SqlConnection};
use ::async_trait::async_trait;
use logrow_core::{BoundStatement, ColumnValue, PlaceholderStyle, UnsupportedError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::MySql;

/// Hands out pooled MySQL connections.
#[derive(Debug, Clone)]
pub struct MySqlConnectionFactory {
    pool: MySqlPool,
}

impl MySqlConnectionFactory {
    /// Open a pool sized and timed by `config`.
    pub async fn connect(config: &DbConfig) -> SinkResult<Self> {
        config.validate()?;
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.timeout())
            .connect(&config.url)
            .await
            .map_err(|e| SinkError::connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionFactory for MySqlConnectionFactory {
    async fn acquire(&self) -> SinkResult<Box<dyn SqlConnection>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| SinkError::connection(e.to_string()))?;
        Ok(Box::new(PooledMySqlConnection { conn }))
    }

    fn placeholder_style(&self) -> Option<PlaceholderStyle> {
        Some(PlaceholderStyle::Positional)
    }
}

/// Returned to the pool on drop.
struct PooledMySqlConnection {
    conn: PoolConnection<MySql>,
}

#[async_trait]
impl SqlConnection for PooledMySqlConnection {
    async fn execute(&mut self, statement: &BoundStatement<'_>) -> SinkResult<u64> {
        ensure_positional(statement)?;

        let mut query = sqlx::query(statement.sql);
        for parameter in &statement.parameters {
            query = match &parameter.value {
                ColumnValue::Null => query.bind(None::<String>),
                ColumnValue::Integer(i) => query.bind(*i),
                ColumnValue::Text(s) => query.bind(s.as_str()),
            };
        }

        let result = query
            .execute(&mut *self.conn)
            .await
            .map_err(|e| SinkError::execution(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

fn ensure_positional(statement: &BoundStatement<'_>) -> SinkResult<()> {
    if statement.style != PlaceholderStyle::Positional && !statement.parameters.is_empty() {
        return Err(SinkError::Core(
            UnsupportedError::PlaceholderStyle {
                style: statement.style.to_string(),
            }
            .into(),
        ));
    }
    Ok(())
}
