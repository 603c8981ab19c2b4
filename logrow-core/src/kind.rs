//! Enum types for column configuration

use crate::{ConfigError, LogRowError, UnsupportedError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default length for variable-length columns.
pub const DEFAULT_COLUMN_LENGTH: u32 = 65535;

/// Default length of the level column. Fits every canonical level name.
pub const DEFAULT_LEVEL_COLUMN_LENGTH: u32 = 16;

/// Length of a hyphenated UUID string.
pub const GUID_LENGTH: u32 = 36;

// ============================================================================
// COLUMN KIND
// ============================================================================

/// Semantic kind of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnKind {
    /// Unbounded text
    Text,
    /// Bounded text, length taken from the data type
    Varchar,
    /// DB-native date-time
    DateTime,
    /// DB-native timestamp
    TimeStamp,
    /// Milliseconds since the Unix epoch
    UnixTime,
    /// Random UUID rendered as text
    Guid,
    /// Server generated integer key
    AutoIncrementInt,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 7] = [
        ColumnKind::Text,
        ColumnKind::Varchar,
        ColumnKind::DateTime,
        ColumnKind::TimeStamp,
        ColumnKind::UnixTime,
        ColumnKind::Guid,
        ColumnKind::AutoIncrementInt,
    ];

    /// Name used in configuration and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Text => "Text",
            ColumnKind::Varchar => "Varchar",
            ColumnKind::DateTime => "DateTime",
            ColumnKind::TimeStamp => "TimeStamp",
            ColumnKind::UnixTime => "UnixTime",
            ColumnKind::Guid => "Guid",
            ColumnKind::AutoIncrementInt => "AutoIncrementInt",
        }
    }

    /// SQL spelling of the kind, used by the generic `<KIND>(<length>)` clause.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Varchar => "VARCHAR",
            ColumnKind::DateTime => "DATETIME",
            ColumnKind::TimeStamp => "TIMESTAMP",
            ColumnKind::UnixTime => "BIGINT",
            ColumnKind::Guid => "CHAR",
            ColumnKind::AutoIncrementInt => "INT",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnKind {
    type Err = LogRowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "text" => Ok(ColumnKind::Text),
            "varchar" => Ok(ColumnKind::Varchar),
            "datetime" => Ok(ColumnKind::DateTime),
            "timestamp" => Ok(ColumnKind::TimeStamp),
            "unixtime" => Ok(ColumnKind::UnixTime),
            "guid" | "uuid" => Ok(ColumnKind::Guid),
            "autoincrementint" | "autoincrement" => Ok(ColumnKind::AutoIncrementInt),
            _ => Err(UnsupportedError::ColumnKind {
                kind: s.to_string(),
            }
            .into()),
        }
    }
}

impl TryFrom<String> for ColumnKind {
    type Error = LogRowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnKind> for String {
    fn from(kind: ColumnKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Lowercase and drop `_`/`-` so `auto_increment_int`, `AutoIncrementInt`
/// and `auto-increment-int` all compare equal.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

// ============================================================================
// DATA TYPE
// ============================================================================

/// Kind plus size hint of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub kind: ColumnKind,
    /// Only read by variable-length kinds.
    pub length: u32,
}

impl DataType {
    pub fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            length: DEFAULT_COLUMN_LENGTH,
        }
    }

    pub fn with_length(kind: ColumnKind, length: u32) -> Self {
        Self { kind, length }
    }

    pub fn text() -> Self {
        Self::new(ColumnKind::Text)
    }

    pub fn varchar(length: u32) -> Self {
        Self::with_length(ColumnKind::Varchar, length)
    }
}

// ============================================================================
// EVENT SERIALIZER
// ============================================================================

/// Format of the serialized-properties column. Only JSON exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventSerializer {
    #[default]
    Json,
}

impl EventSerializer {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSerializer::Json => "Json",
        }
    }
}

impl fmt::Display for EventSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventSerializer {
    type Err = LogRowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "json" => Ok(EventSerializer::Json),
            _ => Err(ConfigError::UnsupportedSerializer {
                format: s.to_string(),
            }
            .into()),
        }
    }
}

impl TryFrom<String> for EventSerializer {
    type Error = LogRowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventSerializer> for String {
    fn from(serializer: EventSerializer) -> Self {
        serializer.as_str().to_string()
    }
}

// ============================================================================
// PLACEHOLDER STYLE
// ============================================================================

/// How INSERT parameters are spelled in the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlaceholderStyle {
    /// `@ColumnName`, bound by name
    #[default]
    Named,
    /// `?`, bound by position
    Positional,
}

impl PlaceholderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderStyle::Named => "Named",
            PlaceholderStyle::Positional => "Positional",
        }
    }

    /// Placeholder text for a column.
    pub fn placeholder(&self, column: &str) -> String {
        match self {
            PlaceholderStyle::Named => format!("@{}", column),
            PlaceholderStyle::Positional => "?".to_string(),
        }
    }
}

impl fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlaceholderStyle {
    type Err = LogRowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "named" => Ok(PlaceholderStyle::Named),
            "positional" => Ok(PlaceholderStyle::Positional),
            _ => Err(UnsupportedError::PlaceholderStyle {
                style: s.to_string(),
            }
            .into()),
        }
    }
}

impl TryFrom<String> for PlaceholderStyle {
    type Error = LogRowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlaceholderStyle> for String {
    fn from(style: PlaceholderStyle) -> Self {
        style.as_str().to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
