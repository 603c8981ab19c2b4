//! Column kind to SQL type clause.

use crate::{ColumnDescriptor, ColumnKind, ConfigError, LogRowResult};

/// SQL type clause of `column` for CREATE TABLE.
///
/// The column must be named; unnamed descriptors are excluded columns and
/// never reach DDL.
pub fn type_clause(column: &ColumnDescriptor) -> LogRowResult<String> {
    if column.name().is_none() {
        return Err(match column.role() {
            Some(role) => ConfigError::MissingColumnName { role },
            None => ConfigError::MissingCustomColumnName,
        }
        .into());
    }

    let data_type = column.data_type;
    let clause = match data_type.kind {
        ColumnKind::TimeStamp => "TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6)".to_string(),
        ColumnKind::DateTime => "DATETIME(6) DEFAULT CURRENT_TIMESTAMP(6)".to_string(),
        ColumnKind::Text => "TEXT".to_string(),
        ColumnKind::AutoIncrementInt => "INT NOT NULL AUTO_INCREMENT".to_string(),
        ColumnKind::Guid => "CHAR(36)".to_string(),
        ColumnKind::UnixTime => "BIGINT".to_string(),
        ColumnKind::Varchar => format!("{}({})", data_type.kind.sql_name(), data_type.length),
    };
    Ok(clause)
}

// =============================================================================
// TESTS
// =============================================================================
