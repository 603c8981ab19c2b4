//! Per-column value extraction from a log event.

use crate::{
    serialize_properties, ColumnDescriptor, ColumnKind, ColumnSource, ConfigError, LogEvent,
    LogRowResult, UnsupportedError,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Format of text timestamps, six fractional digits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Text stored by a custom column whose property is missing from the event.
pub const MISSING_PROPERTY_TEXT: &str = "NULL";

/// Value bound to one INSERT parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Text(String),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => f.write_str("NULL"),
            ColumnValue::Integer(i) => write!(f, "{}", i),
            ColumnValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ColumnValue::Null, Into::into)
    }
}

/// Value to bind for `column` when persisting `event`.
///
/// `rendered_message` is the event's message with its template holes
/// already substituted; it is rendered once per event by the caller.
pub fn value_for(
    column: &ColumnDescriptor,
    event: &LogEvent,
    rendered_message: &str,
) -> LogRowResult<ColumnValue> {
    let value = match &column.source {
        ColumnSource::Id => match column.data_type.kind {
            ColumnKind::AutoIncrementInt => ColumnValue::Null,
            ColumnKind::Guid => ColumnValue::Text(Uuid::new_v4().to_string()),
            kind => {
                return Err(UnsupportedError::ColumnKind {
                    kind: format!("{} as identity", kind),
                }
                .into())
            }
        },
        ColumnSource::TimeStamp { use_utc } => {
            format_timestamp(column, &event.timestamp, *use_utc)?
        }
        ColumnSource::Exception => event.exception.clone().into(),
        ColumnSource::Message => ColumnValue::Text(rendered_message.to_string()),
        ColumnSource::MessageTemplate => {
            ColumnValue::Text(event.message_template.text().to_string())
        }
        ColumnSource::LogEvent { serializer } => {
            ColumnValue::Text(serialize_properties(&event.properties, *serializer)?)
        }
        ColumnSource::Level => ColumnValue::Text(event.level.as_str().to_string()),
        ColumnSource::Custom { value: Some(fixed) } => fixed.clone(),
        ColumnSource::Custom { value: None } => {
            let name = column.name().ok_or(ConfigError::MissingCustomColumnName)?;
            match event.properties.get_ignore_case(name) {
                Some(property) => ColumnValue::Text(property.to_literal()),
                None => ColumnValue::Text(MISSING_PROPERTY_TEXT.to_string()),
            }
        }
    };
    Ok(value)
}

fn format_timestamp(
    column: &ColumnDescriptor,
    timestamp: &DateTime<FixedOffset>,
    use_utc: bool,
) -> LogRowResult<ColumnValue> {
    match (column.data_type.kind, use_utc) {
        (ColumnKind::TimeStamp, false) => Ok(ColumnValue::Text(
            timestamp.format(TIMESTAMP_FORMAT).to_string(),
        )),
        (ColumnKind::TimeStamp, true) => Ok(ColumnValue::Text(
            timestamp
                .with_timezone(&Utc)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        )),
        (ColumnKind::UnixTime, _) => Ok(ColumnValue::Integer(timestamp.timestamp_millis())),
        (kind, _) => Err(UnsupportedError::DateTimeKind {
            column: column.name().unwrap_or_default().to_string(),
            kind: kind.to_string(),
        }
        .into()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
