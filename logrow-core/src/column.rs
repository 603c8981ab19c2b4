//! Column descriptors and the immutable column set of a sink.
//!
//! A [`ColumnSet`] holds one ordered list: the built-in roles in the order of
//! [`ColumnRole::ALL`], followed by custom columns in declaration order. The
//! CREATE TABLE statement, the INSERT statement and value binding all iterate
//! this same list, so their column orders cannot drift apart.

use crate::{
    ColumnKind, ColumnValue, ConfigError, DataType, EventSerializer, LogRowResult,
    UnsupportedError, DEFAULT_COLUMN_LENGTH, DEFAULT_LEVEL_COLUMN_LENGTH, GUID_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// ROLES
// ============================================================================

/// Built-in column slots. Each role appears at most once in a column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Id,
    TimeStamp,
    LogEvent,
    Message,
    MessageTemplate,
    Level,
    Exception,
}

impl ColumnRole {
    /// Declaration order of the built-in columns.
    pub const ALL: [ColumnRole; 7] = [
        ColumnRole::Id,
        ColumnRole::TimeStamp,
        ColumnRole::LogEvent,
        ColumnRole::Message,
        ColumnRole::MessageTemplate,
        ColumnRole::Level,
        ColumnRole::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Id => "Id",
            ColumnRole::TimeStamp => "TimeStamp",
            ColumnRole::LogEvent => "LogEvent",
            ColumnRole::Message => "Message",
            ColumnRole::MessageTemplate => "MessageTemplate",
            ColumnRole::Level => "Level",
            ColumnRole::Exception => "Exception",
        }
    }

    /// Column name used by the default configuration.
    pub fn default_name(&self) -> &'static str {
        match self {
            ColumnRole::Id => "Id",
            ColumnRole::TimeStamp => "TimeStamp",
            ColumnRole::LogEvent => "Event",
            ColumnRole::Message => "Message",
            ColumnRole::MessageTemplate => "Template",
            ColumnRole::Level => "Level",
            ColumnRole::Exception => "Exception",
        }
    }

    fn index(&self) -> usize {
        match self {
            ColumnRole::Id => 0,
            ColumnRole::TimeStamp => 1,
            ColumnRole::LogEvent => 2,
            ColumnRole::Message => 3,
            ColumnRole::MessageTemplate => 4,
            ColumnRole::Level => 5,
            ColumnRole::Exception => 6,
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Where a column's value comes from, with the options specific to that source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSource {
    Id,
    TimeStamp { use_utc: bool },
    LogEvent { serializer: EventSerializer },
    Message,
    MessageTemplate,
    Level,
    Exception,
    /// Fixed value if set, otherwise the same-named event property.
    Custom { value: Option<ColumnValue> },
}

impl ColumnSource {
    /// Built-in slot of this source; `None` for custom columns.
    pub fn role(&self) -> Option<ColumnRole> {
        match self {
            ColumnSource::Id => Some(ColumnRole::Id),
            ColumnSource::TimeStamp { .. } => Some(ColumnRole::TimeStamp),
            ColumnSource::LogEvent { .. } => Some(ColumnRole::LogEvent),
            ColumnSource::Message => Some(ColumnRole::Message),
            ColumnSource::MessageTemplate => Some(ColumnRole::MessageTemplate),
            ColumnSource::Level => Some(ColumnRole::Level),
            ColumnSource::Exception => Some(ColumnRole::Exception),
            ColumnSource::Custom { .. } => None,
        }
    }
}

/// One destination column. A descriptor without a name is excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: Option<String>,
    pub data_type: DataType,
    pub source: ColumnSource,
}

impl ColumnDescriptor {
    /// Default descriptor for a built-in role.
    pub fn for_role(role: ColumnRole, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        let (data_type, source) = match role {
            ColumnRole::Id => (DataType::new(ColumnKind::AutoIncrementInt), ColumnSource::Id),
            ColumnRole::TimeStamp => (
                DataType::new(ColumnKind::TimeStamp),
                ColumnSource::TimeStamp { use_utc: false },
            ),
            ColumnRole::LogEvent => (
                DataType::text(),
                ColumnSource::LogEvent {
                    serializer: EventSerializer::Json,
                },
            ),
            ColumnRole::Message => (DataType::text(), ColumnSource::Message),
            ColumnRole::MessageTemplate => (DataType::text(), ColumnSource::MessageTemplate),
            ColumnRole::Level => (
                DataType::varchar(DEFAULT_LEVEL_COLUMN_LENGTH),
                ColumnSource::Level,
            ),
            ColumnRole::Exception => (DataType::text(), ColumnSource::Exception),
        };
        Self {
            name,
            data_type,
            source,
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::Id, name)
    }

    /// Identity column filled with a fresh UUID per row.
    pub fn guid_id(name: impl Into<String>) -> Self {
        Self::id(name).with_data_type(DataType::with_length(ColumnKind::Guid, GUID_LENGTH))
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::TimeStamp, name)
    }

    pub fn log_event(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::LogEvent, name)
    }

    pub fn message(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::Message, name)
    }

    pub fn message_template(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::MessageTemplate, name)
    }

    pub fn level(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::Level, name)
    }

    pub fn exception(name: impl Into<String>) -> Self {
        Self::for_role(ColumnRole::Exception, name)
    }

    pub fn custom(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Some(name.into()),
            data_type,
            source: ColumnSource::Custom { value: None },
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.data_type.kind = kind;
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.data_type.length = length;
        self
    }

    /// Render timestamps in UTC. Ignored by other sources.
    pub fn use_utc(mut self, utc: bool) -> Self {
        if let ColumnSource::TimeStamp { use_utc } = &mut self.source {
            *use_utc = utc;
        }
        self
    }

    /// Fixed value of a custom column. Ignored by built-in sources. A null
    /// value keeps the property lookup.
    pub fn with_value(mut self, fixed: impl Into<ColumnValue>) -> Self {
        if let ColumnSource::Custom { value } = &mut self.source {
            let fixed = fixed.into();
            *value = (!fixed.is_null()).then_some(fixed);
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn role(&self) -> Option<ColumnRole> {
        self.source.role()
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.source, ColumnSource::Id)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.data_type.kind == ColumnKind::AutoIncrementInt
    }

    /// Named and not server generated.
    pub fn is_insertable(&self) -> bool {
        self.name.is_some() && !self.is_auto_increment()
    }

    fn has_usable_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

// ============================================================================
// COLUMN SET
// ============================================================================

/// Validated, immutable columns of one sink, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    /// Builder seeded with the seven default columns.
    pub fn builder() -> ColumnSetBuilder {
        ColumnSetBuilder {
            slots: ColumnRole::ALL.map(|role| {
                Slot::Column(ColumnDescriptor::for_role(role, role.default_name()))
            }),
            custom: Vec::new(),
        }
    }

    /// Builder with every built-in column excluded.
    pub fn builder_empty() -> ColumnSetBuilder {
        ColumnSetBuilder {
            slots: ColumnRole::ALL.map(|_| Slot::Excluded),
            custom: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn insertable(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_insertable())
    }

    pub fn identity(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_identity())
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self {
            columns: ColumnRole::ALL
                .iter()
                .map(|role| ColumnDescriptor::for_role(*role, role.default_name()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Column(ColumnDescriptor),
    Excluded,
}

/// Assembles a [`ColumnSet`]. All checks run in [`ColumnSetBuilder::build`].
#[derive(Debug, Clone)]
pub struct ColumnSetBuilder {
    slots: [Slot; 7],
    custom: Vec<ColumnDescriptor>,
}

impl ColumnSetBuilder {
    /// Replace the built-in slot named by the descriptor's source, or append
    /// a custom column.
    pub fn with(mut self, descriptor: ColumnDescriptor) -> Self {
        match descriptor.role() {
            Some(role) => self.slots[role.index()] = Slot::Column(descriptor),
            None => self.custom.push(descriptor),
        }
        self
    }

    pub fn exclude(mut self, role: ColumnRole) -> Self {
        self.slots[role.index()] = Slot::Excluded;
        self
    }

    pub fn build(self) -> LogRowResult<ColumnSet> {
        let mut columns = Vec::with_capacity(self.slots.len() + self.custom.len());

        for (role, slot) in ColumnRole::ALL.iter().zip(self.slots) {
            if let Slot::Column(descriptor) = slot {
                if !descriptor.has_usable_name() {
                    return Err(ConfigError::MissingColumnName { role: *role }.into());
                }
                columns.push(descriptor);
            }
        }
        for descriptor in self.custom {
            if !descriptor.has_usable_name() {
                return Err(ConfigError::MissingCustomColumnName.into());
            }
            columns.push(descriptor);
        }

        validate_columns(&columns)?;
        Ok(ColumnSet { columns })
    }
}

/// Checks shared by the builder: unique names, an auto-increment or guid
/// identity, auto-increment only on the identity, sane varchar lengths and a
/// formattable timestamp kind.
fn validate_columns(columns: &[ColumnDescriptor]) -> LogRowResult<()> {
    ensure_unique_names(columns.iter().filter_map(|c| c.name()))?;

    for column in columns {
        let name = column.name().unwrap_or_default();

        if column.is_identity()
            && !matches!(
                column.data_type.kind,
                ColumnKind::AutoIncrementInt | ColumnKind::Guid
            )
        {
            return Err(UnsupportedError::ColumnKind {
                kind: format!("{} as identity", column.data_type.kind),
            }
            .into());
        }

        if column.is_auto_increment() && !column.is_identity() {
            return Err(ConfigError::AutoIncrementOutsideIdentity {
                column: name.to_string(),
            }
            .into());
        }

        if column.data_type.kind == ColumnKind::Varchar
            && !(1..=DEFAULT_COLUMN_LENGTH).contains(&column.data_type.length)
        {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.length", name),
                value: column.data_type.length.to_string(),
                reason: format!("varchar length must be between 1 and {}", DEFAULT_COLUMN_LENGTH),
            }
            .into());
        }

        if let ColumnSource::TimeStamp { .. } = column.source {
            if !matches!(
                column.data_type.kind,
                ColumnKind::TimeStamp | ColumnKind::UnixTime
            ) {
                return Err(UnsupportedError::DateTimeKind {
                    column: name.to_string(),
                    kind: column.data_type.kind.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Column names compare case-insensitively, as MySQL identifiers do.
pub(crate) fn ensure_unique_names<'a>(names: impl Iterator<Item = &'a str>) -> LogRowResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::DuplicateColumn {
                name: name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogRowError;

    fn names(set: &ColumnSet) -> Vec<&str> {
        set.columns().iter().filter_map(|c| c.name()).collect()
    }

    #[test]
    fn test_default_columns() {
        let set = ColumnSet::builder().build().unwrap();
        assert_eq!(
            names(&set),
            vec!["Id", "TimeStamp", "Event", "Message", "Template", "Level", "Exception"]
        );
        assert_eq!(set, ColumnSet::default());
        assert_eq!(set.identity().and_then(|c| c.name()), Some("Id"));
        assert_eq!(
            set.get("level").map(|c| c.data_type),
            Some(DataType::varchar(DEFAULT_LEVEL_COLUMN_LENGTH))
        );
    }

    #[test]
    fn test_insertable_skips_auto_increment_identity() {
        let set = ColumnSet::default();
        let insertable: Vec<_> = set.insertable().filter_map(|c| c.name()).collect();
        assert_eq!(
            insertable,
            vec!["TimeStamp", "Event", "Message", "Template", "Level", "Exception"]
        );

        let guid = ColumnSet::builder()
            .with(ColumnDescriptor::guid_id("Id"))
            .build()
            .unwrap();
        assert_eq!(guid.insertable().count(), 7);
    }

    #[test]
    fn test_with_replaces_slot_and_keeps_order() {
        let set = ColumnSet::builder()
            .with(ColumnDescriptor::level("Severity").with_length(32))
            .with(ColumnDescriptor::custom("Region", DataType::varchar(8)))
            .with(ColumnDescriptor::timestamp("At").use_utc(true))
            .build()
            .unwrap();
        assert_eq!(
            names(&set),
            vec!["Id", "At", "Event", "Message", "Template", "Severity", "Exception", "Region"]
        );
        assert_eq!(
            set.get("At").map(|c| &c.source),
            Some(&ColumnSource::TimeStamp { use_utc: true })
        );
    }

    #[test]
    fn test_exclude_removes_slot() {
        let set = ColumnSet::builder()
            .exclude(ColumnRole::Exception)
            .exclude(ColumnRole::MessageTemplate)
            .build()
            .unwrap();
        assert_eq!(
            names(&set),
            vec!["Id", "TimeStamp", "Event", "Message", "Level"]
        );
    }

    #[test]
    fn test_empty_builder() {
        let set = ColumnSet::builder_empty()
            .with(ColumnDescriptor::message("Text"))
            .build()
            .unwrap();
        assert_eq!(names(&set), vec!["Text"]);
        assert!(set.identity().is_none());
    }

    #[test]
    fn test_unnamed_descriptor_rejected() {
        let mut unnamed = ColumnDescriptor::level("x");
        unnamed.name = None;
        let err = ColumnSet::builder().with(unnamed).build().unwrap_err();
        assert_eq!(
            err,
            LogRowError::Config(ConfigError::MissingColumnName {
                role: ColumnRole::Level
            })
        );

        let blank = ColumnDescriptor::custom("  ", DataType::text());
        let err = ColumnSet::builder().with(blank).build().unwrap_err();
        assert_eq!(err, LogRowError::Config(ConfigError::MissingCustomColumnName));
    }

    #[test]
    fn test_duplicate_names_rejected_case_insensitively() {
        let err = ColumnSet::builder()
            .with(ColumnDescriptor::custom("level", DataType::text()))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            LogRowError::Config(ConfigError::DuplicateColumn {
                name: "level".to_string()
            })
        );
    }

    #[test]
    fn test_auto_increment_only_on_identity() {
        let err = ColumnSet::builder()
            .with(ColumnDescriptor::custom(
                "Seq",
                DataType::new(ColumnKind::AutoIncrementInt),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            LogRowError::Config(ConfigError::AutoIncrementOutsideIdentity { .. })
        ));
    }

    #[test]
    fn test_identity_kind_must_be_auto_increment_or_guid() {
        for kind in [ColumnKind::UnixTime, ColumnKind::TimeStamp, ColumnKind::DateTime] {
            let err = ColumnSet::builder()
                .with(ColumnDescriptor::id("Id").with_kind(kind))
                .build()
                .unwrap_err();
            assert!(matches!(
                err,
                LogRowError::Unsupported(UnsupportedError::ColumnKind { .. })
            ));
        }
        assert!(ColumnSet::builder()
            .with(ColumnDescriptor::guid_id("Id"))
            .build()
            .is_ok());
    }

    #[test]
    fn test_varchar_length_bounds() {
        let err = ColumnSet::builder()
            .with(ColumnDescriptor::level("Level").with_length(0))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            LogRowError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_timestamp_kind_must_be_formattable() {
        let err = ColumnSet::builder()
            .with(ColumnDescriptor::timestamp("TimeStamp").with_kind(ColumnKind::DateTime))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            LogRowError::Unsupported(UnsupportedError::DateTimeKind { .. })
        ));

        assert!(ColumnSet::builder()
            .with(ColumnDescriptor::timestamp("TimeStamp").with_kind(ColumnKind::UnixTime))
            .build()
            .is_ok());
    }

    #[test]
    fn test_option_setters_ignore_other_sources() {
        let level = ColumnDescriptor::level("Level").use_utc(true).with_value("x");
        assert_eq!(level.source, ColumnSource::Level);

        let custom = ColumnDescriptor::custom("App", DataType::text()).with_value("api");
        assert_eq!(
            custom.source,
            ColumnSource::Custom {
                value: Some(ColumnValue::Text("api".to_string()))
            }
        );
    }

    #[test]
    fn test_null_fixed_value_keeps_lookup() {
        let custom = ColumnDescriptor::custom("App", DataType::text()).with_value(None::<&str>);
        assert_eq!(custom.source, ColumnSource::Custom { value: None });

        let reset = ColumnDescriptor::custom("App", DataType::text())
            .with_value("api")
            .with_value(ColumnValue::Null);
        assert_eq!(reset.source, ColumnSource::Custom { value: None });
    }
}
