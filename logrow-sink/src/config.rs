//! Configuration loading for a log sink.
//!
//! A TOML file carries three optional tables:
//!
//! ```toml
//! [sink]
//! table_name = "AppLogs"
//! create_table = true
//! placeholders = "positional"
//!
//! [database]
//! url = "mysql://logger@localhost/app"
//! pool_size = 8
//! timeout_secs = 10
//!
//! [columns.timestamp]
//! use_utc = true
//!
//! [columns.exception]
//! exclude = true
//!
//! [[columns.custom]]
//! name = "App"
//! kind = "varchar"
//! length = 32
//! value = "billing"
//! ```
//!
//! `LOGROW_*` environment variables override the file.

use crate::{SinkError, SinkResult};
use logrow_core::{ColumnSet, ColumnsConfig, PlaceholderStyle, SinkOptions};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_TABLE_NAME: &str = "LOGROW_TABLE_NAME";
pub const ENV_CREATE_TABLE: &str = "LOGROW_CREATE_TABLE";
pub const ENV_PLACEHOLDERS: &str = "LOGROW_PLACEHOLDERS";
pub const ENV_DB_URL: &str = "LOGROW_DB_URL";
pub const ENV_DB_POOL_SIZE: &str = "LOGROW_DB_POOL_SIZE";
pub const ENV_DB_TIMEOUT: &str = "LOGROW_DB_TIMEOUT";

// ============================================================================
// DATABASE
// ============================================================================

/// Connection pool settings for the bundled MySQL factory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DbConfig {
    pub url: String,
    pub pool_size: u32,
    /// Seconds to wait for a pooled connection.
    pub timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: 16,
            timeout_secs: 30,
        }
    }
}

impl DbConfig {
    /// Build from `LOGROW_DB_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var(ENV_DB_URL).unwrap_or(defaults.url),
            pool_size: std::env::var(ENV_DB_POOL_SIZE)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            timeout_secs: std::env::var(ENV_DB_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> SinkResult<()> {
        if self.url.trim().is_empty() {
            return Err(SinkError::InvalidValue {
                field: "database.url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.pool_size == 0 {
            return Err(SinkError::InvalidValue {
                field: "database.pool_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(SinkError::InvalidValue {
                field: "database.timeout_secs",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SINK CONFIG
// ============================================================================

/// Everything needed to construct a [`crate::LogSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SinkConfig {
    pub sink: SinkOptions,
    pub columns: ColumnsConfig,
    pub database: Option<DbConfig>,
}

impl SinkConfig {
    pub fn from_path(path: &Path) -> SinkResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> SinkResult<Self> {
        let config: SinkConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Read the file, apply environment overrides and validate.
    pub fn load(path: &Path) -> SinkResult<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LOGROW_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> SinkResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by the `LOGROW_*` names.
    pub fn apply_overrides<L>(&mut self, lookup: L) -> SinkResult<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(table_name) = lookup(ENV_TABLE_NAME) {
            self.sink.table_name = table_name;
        }
        if let Some(raw) = lookup(ENV_CREATE_TABLE) {
            self.sink.create_table = parse_bool(ENV_CREATE_TABLE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PLACEHOLDERS) {
            self.sink.placeholders =
                PlaceholderStyle::from_str(&raw).map_err(|e| SinkError::InvalidValue {
                    field: ENV_PLACEHOLDERS,
                    reason: e.to_string(),
                })?;
        }

        let db_url = lookup(ENV_DB_URL);
        let pool_size = lookup(ENV_DB_POOL_SIZE);
        let timeout = lookup(ENV_DB_TIMEOUT);
        if db_url.is_some() || pool_size.is_some() || timeout.is_some() {
            let database = self.database.get_or_insert_with(DbConfig::default);
            if let Some(url) = db_url {
                database.url = url;
            }
            if let Some(raw) = pool_size {
                database.pool_size = parse_number(ENV_DB_POOL_SIZE, &raw)?;
            }
            if let Some(raw) = timeout {
                database.timeout_secs = parse_number(ENV_DB_TIMEOUT, &raw)?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> SinkResult<()> {
        self.sink.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        Ok(())
    }

    /// Column set described by the `[columns]` table.
    pub fn column_set(&self) -> SinkResult<ColumnSet> {
        Ok(self.columns.to_column_set()?)
    }
}

fn parse_bool(field: &'static str, raw: &str) -> SinkResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SinkError::InvalidValue {
            field,
            reason: format!("expected a boolean, got '{}'", raw),
        }),
    }
}

fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> SinkResult<T> {
    raw.trim().parse().map_err(|_| SinkError::InvalidValue {
        field,
        reason: format!("expected a number, got '{}'", raw),
    })
}

// =============================================================================
// TESTS
// =============================================================================
