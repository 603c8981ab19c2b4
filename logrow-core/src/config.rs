//! Configuration types

use crate::{
    ColumnDescriptor, ColumnKind, ColumnRole, ColumnSet, ColumnSource, ColumnValue, ConfigError,
    DataType, EventSerializer, LogRowResult, PlaceholderStyle, GUID_LENGTH,
};
use serde::{Deserialize, Serialize};

/// Default destination table.
pub const DEFAULT_TABLE_NAME: &str = "Logs";

/// Sink-level behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SinkOptions {
    pub table_name: String,
    /// Issue `CREATE TABLE IF NOT EXISTS` once at construction.
    pub create_table: bool,
    pub placeholders: PlaceholderStyle,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            create_table: true,
            placeholders: PlaceholderStyle::Named,
        }
    }
}

impl SinkOptions {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    pub fn with_create_table(mut self, create_table: bool) -> Self {
        self.create_table = create_table;
        self
    }

    pub fn with_placeholders(mut self, placeholders: PlaceholderStyle) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn validate(&self) -> LogRowResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "table_name".to_string(),
                value: self.table_name.clone(),
                reason: "table name must be specified".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// COLUMN CONFIGURATION
// ============================================================================

/// Override of one built-in column. Unset fields keep the role's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ColumnOverride {
    pub name: Option<String>,
    pub kind: Option<ColumnKind>,
    pub length: Option<u32>,
    /// Timestamp column only.
    pub use_utc: Option<bool>,
    /// Serialized-properties column only.
    pub serializer: Option<EventSerializer>,
    pub exclude: bool,
}

/// Declaration of a custom column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomColumnConfig {
    pub name: String,
    #[serde(default = "default_custom_kind")]
    pub kind: ColumnKind,
    pub length: Option<u32>,
    pub value: Option<ColumnValue>,
}

fn default_custom_kind() -> ColumnKind {
    ColumnKind::Text
}

/// Column layout as written in a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ColumnsConfig {
    pub id: Option<ColumnOverride>,
    pub timestamp: Option<ColumnOverride>,
    pub log_event: Option<ColumnOverride>,
    pub message: Option<ColumnOverride>,
    pub message_template: Option<ColumnOverride>,
    pub level: Option<ColumnOverride>,
    pub exception: Option<ColumnOverride>,
    pub custom: Vec<CustomColumnConfig>,
}

impl ColumnsConfig {
    fn override_for(&self, role: ColumnRole) -> Option<&ColumnOverride> {
        match role {
            ColumnRole::Id => self.id.as_ref(),
            ColumnRole::TimeStamp => self.timestamp.as_ref(),
            ColumnRole::LogEvent => self.log_event.as_ref(),
            ColumnRole::Message => self.message.as_ref(),
            ColumnRole::MessageTemplate => self.message_template.as_ref(),
            ColumnRole::Level => self.level.as_ref(),
            ColumnRole::Exception => self.exception.as_ref(),
        }
    }

    /// Apply the overrides to the default columns and validate the result.
    pub fn to_column_set(&self) -> LogRowResult<ColumnSet> {
        let mut builder = ColumnSet::builder();

        for role in ColumnRole::ALL {
            let Some(column) = self.override_for(role) else {
                continue;
            };
            builder = if column.exclude {
                if column.name.is_some() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("columns.{}", role),
                        value: column.name.clone().unwrap_or_default(),
                        reason: "an excluded column cannot have a name".to_string(),
                    }
                    .into());
                }
                builder.exclude(role)
            } else {
                builder.with(apply_override(role, column)?)
            };
        }

        for custom in &self.custom {
            let mut data_type = DataType::new(custom.kind);
            if let Some(length) = custom.length {
                data_type.length = length;
            }
            let mut descriptor = ColumnDescriptor::custom(custom.name.clone(), data_type);
            if let Some(value) = &custom.value {
                descriptor = descriptor.with_value(value.clone());
            }
            builder = builder.with(descriptor);
        }

        builder.build()
    }
}

fn apply_override(role: ColumnRole, column: &ColumnOverride) -> LogRowResult<ColumnDescriptor> {
    let name = column
        .name
        .clone()
        .unwrap_or_else(|| role.default_name().to_string());
    let mut descriptor = ColumnDescriptor::for_role(role, name);

    if let Some(kind) = column.kind {
        descriptor = descriptor.with_kind(kind);
        if kind == ColumnKind::Guid {
            descriptor = descriptor.with_length(GUID_LENGTH);
        }
    }
    if let Some(length) = column.length {
        descriptor = descriptor.with_length(length);
    }

    match (&mut descriptor.source, column.use_utc, column.serializer) {
        (_, None, None) => {}
        (ColumnSource::TimeStamp { use_utc }, Some(utc), None) => *use_utc = utc,
        (ColumnSource::LogEvent { serializer }, None, Some(format)) => *serializer = format,
        _ => {
            return Err(ConfigError::InvalidValue {
                field: format!("columns.{}", role),
                value: format!("use_utc={:?}, serializer={:?}", column.use_utc, column.serializer),
                reason: "option does not apply to this column".to_string(),
            }
            .into())
        }
    }
    Ok(descriptor)
}

// =============================================================================
// TESTS
// =============================================================================
