//! LOGROW Core - Log Event Rows
//!
//! Log event model, destination column layout, SQL generation and per-column
//! value extraction. Everything here is synchronous and free of I/O; the
//! `logrow-sink` crate drives a database connection with these types.

pub mod column;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod kind;
pub mod property;
pub mod statement;
pub mod type_map;

pub use column::{ColumnDescriptor, ColumnRole, ColumnSet, ColumnSetBuilder, ColumnSource};
pub use config::{
    ColumnOverride, ColumnsConfig, CustomColumnConfig, SinkOptions, DEFAULT_TABLE_NAME,
};
pub use error::{ConfigError, LogRowError, LogRowResult, UnsupportedError};
pub use event::{Level, LogEvent, MessageTemplate};
pub use extract::{value_for, ColumnValue, MISSING_PROPERTY_TEXT, TIMESTAMP_FORMAT};
pub use kind::{
    ColumnKind, DataType, EventSerializer, PlaceholderStyle, DEFAULT_COLUMN_LENGTH,
    DEFAULT_LEVEL_COLUMN_LENGTH, GUID_LENGTH,
};
pub use property::{serialize_properties, PropertyBag, PropertyValue, ScalarValue};
pub use statement::{
    create_table_statement, insert_statement, BoundParameter, BoundStatement, InsertStatement,
};
pub use type_map::type_clause;
