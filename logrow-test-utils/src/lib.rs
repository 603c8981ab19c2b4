//! LOGROW Test Utilities
//!
//! Centralized test infrastructure for the logrow workspace:
//! - Proptest generators for events, property values and column sets
//! - The recording connection factory
//! - Test fixtures for common scenarios
//! - Custom assertions for logrow errors

// Re-export the recording factory from its source crate
pub use logrow_sink::{ExecutedStatement, RecordingConnectionFactory};

// Re-export core types for convenience
pub use logrow_core::{
    ColumnDescriptor, ColumnKind, ColumnRole, ColumnSet, ColumnSource, ColumnValue, ConfigError,
    DataType, Level, LogEvent, LogRowError, LogRowResult, PlaceholderStyle, PropertyBag,
    PropertyValue, ScalarValue, SinkOptions, UnsupportedError,
};

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating logrow types.

    use super::*;
    use proptest::prelude::*;

    /// Generate any severity level.
    pub fn arb_level() -> impl Strategy<Value = Level> {
        prop_oneof![
            Just(Level::Verbose),
            Just(Level::Debug),
            Just(Level::Information),
            Just(Level::Warning),
            Just(Level::Error),
            Just(Level::Fatal),
        ]
    }

    /// Generate any declared column kind.
    pub fn arb_column_kind() -> impl Strategy<Value = ColumnKind> {
        proptest::sample::select(ColumnKind::ALL.to_vec())
    }

    /// Kinds a custom column may use (everything but auto-increment).
    pub fn arb_custom_kind() -> impl Strategy<Value = ColumnKind> {
        arb_column_kind().prop_filter("auto-increment is identity only", |k| {
            *k != ColumnKind::AutoIncrementInt
        })
    }

    /// Generate an instant between 2000 and 2038 with microsecond precision
    /// and a whole-quarter-hour offset.
    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<FixedOffset>> {
        (946684800i64..2145916800i64, 0u32..1_000_000, -48i32..=56).prop_filter_map(
            "representable instant",
            |(secs, micros, quarters)| {
                let offset = FixedOffset::east_opt(quarters * 15 * 60)?;
                offset.timestamp_opt(secs, micros * 1000).single()
            },
        )
    }

    /// Generate a scalar property value.
    pub fn arb_scalar() -> impl Strategy<Value = ScalarValue> {
        prop_oneof![
            Just(ScalarValue::Null),
            any::<bool>().prop_map(ScalarValue::Bool),
            any::<i64>().prop_map(ScalarValue::Int),
            any::<u64>().prop_map(ScalarValue::UInt),
            (-1.0e9f64..1.0e9f64).prop_map(ScalarValue::Float),
            "[ -~]{0,16}".prop_map(ScalarValue::String),
        ]
    }

    /// Generate a property value nested up to three levels deep.
    pub fn arb_property_value() -> impl Strategy<Value = PropertyValue> {
        let leaf = arb_scalar().prop_map(PropertyValue::Scalar);
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(PropertyValue::Sequence),
                (
                    prop::option::of("[A-Z][a-z]{0,6}"),
                    prop::collection::vec(("[a-z]{1,6}", inner.clone()), 0..4),
                )
                    .prop_map(|(type_tag, properties)| PropertyValue::Structure {
                        type_tag,
                        properties,
                    }),
                prop::collection::vec(("[a-z]{1,6}".prop_map(ScalarValue::String), inner), 0..4)
                    .prop_map(PropertyValue::Dictionary),
            ]
        })
    }

    /// Generate a property bag with up to `max` entries.
    pub fn arb_property_bag(max: usize) -> impl Strategy<Value = PropertyBag> {
        prop::collection::vec(("[a-zA-Z][a-zA-Z0-9_]{0,10}", arb_property_value()), 0..=max)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Generate a complete log event.
    pub fn arb_event() -> impl Strategy<Value = LogEvent> {
        (
            arb_timestamp(),
            arb_level(),
            "[ -z|~]{0,40}",
            prop::option::of("[ -~\n]{1,80}"),
            arb_property_bag(6),
        )
            .prop_map(|(timestamp, level, template, exception, properties)| {
                let mut event = LogEvent::new(timestamp, level, template);
                event.exception = exception;
                event.properties = properties;
                event
            })
    }

    /// Generate a named custom column. Names carry a `C_` prefix so they
    /// never collide with the built-in column names.
    pub fn arb_custom_column(name: String) -> impl Strategy<Value = ColumnDescriptor> {
        (
            arb_custom_kind(),
            1u32..=255,
            prop::option::of("[a-z]{1,8}"),
        )
            .prop_map(move |(kind, length, fixed)| {
                let column = ColumnDescriptor::custom(
                    format!("C_{}", name),
                    DataType::with_length(kind, length),
                );
                match fixed {
                    Some(value) => column.with_value(value),
                    None => column,
                }
            })
    }

    /// Generate up to `max` custom columns with distinct names.
    pub fn arb_custom_columns(max: usize) -> impl Strategy<Value = Vec<ColumnDescriptor>> {
        prop::collection::hash_set("[a-z]{1,8}", 0..=max).prop_flat_map(|names| {
            names
                .into_iter()
                .map(arb_custom_column)
                .collect::<Vec<_>>()
        })
    }

    /// Generate a valid column set: an identity column (auto-increment or
    /// guid), a random subset of the other built-in roles, and custom columns.
    /// At least one column is insertable.
    pub fn arb_column_set() -> impl Strategy<Value = ColumnSet> {
        (
            any::<bool>(),
            prop::collection::vec(any::<bool>(), 6),
            any::<bool>(),
            arb_custom_columns(4),
        )
            .prop_filter_map(
                "column set must build",
                |(guid_id, keep, use_utc, custom)| {
                    let mut builder = ColumnSet::builder();
                    if guid_id {
                        builder = builder.with(ColumnDescriptor::guid_id("Id"));
                    }
                    builder = builder
                        .with(ColumnDescriptor::timestamp("TimeStamp").use_utc(use_utc));
                    for (role, keep) in ColumnRole::ALL[1..].iter().zip(keep) {
                        if !keep {
                            builder = builder.exclude(*role);
                        }
                    }
                    for column in custom {
                        builder = builder.with(column);
                    }
                    builder
                        .build()
                        .ok()
                        .filter(|set| set.insertable().next().is_some())
                },
            )
    }

    /// Generate a descriptor list with exactly `identities` identity columns
    /// plus a timestamp and some custom columns.
    pub fn arb_descriptors_with_identities(
        identities: usize,
    ) -> impl Strategy<Value = Vec<ColumnDescriptor>> {
        arb_custom_columns(4).prop_map(move |custom| {
            let mut columns: Vec<ColumnDescriptor> = (0..identities)
                .map(|i| ColumnDescriptor::guid_id(format!("Id{}", i)))
                .collect();
            columns.push(ColumnDescriptor::timestamp("TimeStamp"));
            columns.extend(custom);
            columns
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// `2021-03-04T10:15:30.123456+02:00`
    pub fn sample_timestamp() -> DateTime<FixedOffset> {
        let utc = DateTime::from_timestamp_micros(1_614_845_730_123_456).unwrap_or_default();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap_or(Utc.fix());
        utc.with_timezone(&offset)
    }

    /// Login event with `user` and `region` properties.
    pub fn sample_event() -> LogEvent {
        LogEvent::new(
            sample_timestamp(),
            Level::Information,
            "User {user} logged in from {region}",
        )
        .with_property("user", "alice")
        .with_property("region", "eu")
    }

    /// Error event carrying an exception.
    pub fn error_event() -> LogEvent {
        LogEvent::new(sample_timestamp(), Level::Error, "Payment {id} failed")
            .with_property("id", 42i64)
            .with_exception("timeout contacting gateway\nCaused by: connection reset")
    }

    /// Event with no properties.
    pub fn bare_event() -> LogEvent {
        LogEvent::new(sample_timestamp(), Level::Debug, "heartbeat")
    }

    /// The seven default columns.
    pub fn default_columns() -> ColumnSet {
        ColumnSet::default()
    }

    /// Guid identity, UTC timestamps and two custom columns.
    pub fn custom_columns() -> LogRowResult<ColumnSet> {
        ColumnSet::builder()
            .with(ColumnDescriptor::guid_id("Id"))
            .with(ColumnDescriptor::timestamp("TimeStamp").use_utc(true))
            .with(ColumnDescriptor::custom("Region", DataType::varchar(8)))
            .with(ColumnDescriptor::custom("App", DataType::text()).with_value("billing"))
            .build()
    }

    /// Options for table `Logs` with positional placeholders.
    pub fn positional_options() -> SinkOptions {
        SinkOptions::default().with_placeholders(PlaceholderStyle::Positional)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for logrow-specific validation.

    use super::*;

    /// Assert that a LogRowResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &LogRowResult<T>) {
        match result {
            Err(LogRowError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a LogRowResult is an IdentityColumnCount error.
    #[track_caller]
    pub fn assert_identity_count_error<T: std::fmt::Debug>(
        result: &LogRowResult<T>,
        expected: usize,
    ) {
        match result {
            Err(LogRowError::Config(ConfigError::IdentityColumnCount { count })) => {
                assert_eq!(*count, expected, "Wrong identity count in error");
            }
            other => panic!(
                "Expected IdentityColumnCount({}) error, got: {:?}",
                expected, other
            ),
        }
    }

    /// Assert that a LogRowResult is an Unsupported error.
    #[track_caller]
    pub fn assert_unsupported<T: std::fmt::Debug>(result: &LogRowResult<T>) {
        match result {
            Err(LogRowError::Unsupported(_)) => {}
            other => panic!("Expected Unsupported error, got: {:?}", other),
        }
    }

    /// Assert that the insertable columns of `columns` are exactly the
    /// parameter columns of an insert, in order.
    #[track_caller]
    pub fn assert_insert_matches_columns(statement: &ExecutedStatement, columns: &ColumnSet) {
        let expected: Vec<&str> = columns.insertable().filter_map(|c| c.name()).collect();
        let actual: Vec<&str> = statement.parameters.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(actual, expected, "Insert parameters out of column order");
    }
}

// =============================================================================
// TESTS
// =============================================================================
