//! CREATE TABLE and INSERT generation.
//!
//! Both statements walk the same descriptor slice in the same order. For the
//! default column set and table `Logs`:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS Logs (Id INT NOT NULL AUTO_INCREMENT,
//!     TimeStamp TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6), Event TEXT,
//!     Message TEXT, Template TEXT, Level VARCHAR(16), Exception TEXT,
//!     PRIMARY KEY (Id))
//!
//! INSERT INTO Logs (TimeStamp, Event, Message, Template, Level, Exception)
//!     VALUES (@TimeStamp, @Event, @Message, @Template, @Level, @Exception)
//! ```

use crate::column::ensure_unique_names;
use crate::{
    type_clause, ColumnDescriptor, ColumnSet, ColumnValue, ConfigError, LogRowResult,
    PlaceholderStyle,
};

// ============================================================================
// STATEMENTS
// ============================================================================

/// Prepared INSERT text plus its parameter columns, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    sql: String,
    columns: Vec<String>,
    style: PlaceholderStyle,
}

impl InsertStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Column names, one per placeholder, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    /// Pair each placeholder with its value. `values` must follow
    /// [`InsertStatement::columns`].
    pub fn bind(&self, values: Vec<ColumnValue>) -> LogRowResult<BoundStatement<'_>> {
        if values.len() != self.columns.len() {
            return Err(ConfigError::ParameterCount {
                expected: self.columns.len(),
                got: values.len(),
            }
            .into());
        }
        let parameters = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| BoundParameter {
                column: column.as_str(),
                value,
            })
            .collect();
        Ok(BoundStatement {
            sql: &self.sql,
            style: self.style,
            parameters,
        })
    }
}

/// One bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParameter<'s> {
    pub column: &'s str,
    pub value: ColumnValue,
}

impl BoundParameter<'_> {
    /// Name to bind under when the statement uses named placeholders.
    pub fn placeholder(&self, style: PlaceholderStyle) -> String {
        style.placeholder(self.column)
    }
}

/// SQL text with its parameter values, ready for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundStatement<'s> {
    pub sql: &'s str,
    pub style: PlaceholderStyle,
    pub parameters: Vec<BoundParameter<'s>>,
}

impl<'s> BoundStatement<'s> {
    /// Statement without parameters, e.g. DDL.
    pub fn plain(sql: &'s str) -> Self {
        Self {
            sql,
            style: PlaceholderStyle::default(),
            parameters: Vec::new(),
        }
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// `CREATE TABLE IF NOT EXISTS` over every named descriptor, primary key on
/// the single identity column. Nameless descriptors are excluded columns.
pub fn create_table_statement(table: &str, columns: &[ColumnDescriptor]) -> LogRowResult<String> {
    validate_table_name(table)?;

    let columns: Vec<&ColumnDescriptor> = columns.iter().filter(|c| c.name().is_some()).collect();
    let mut names = Vec::with_capacity(columns.len());
    for column in columns.iter().copied() {
        names.push(column_name(column)?);
    }
    ensure_unique_names(names.iter().copied())?;

    let identities: Vec<&str> = columns
        .iter()
        .zip(&names)
        .filter(|(c, _)| c.is_identity())
        .map(|(_, name)| *name)
        .collect();
    let [identity] = identities.as_slice() else {
        return Err(ConfigError::IdentityColumnCount {
            count: identities.len(),
        }
        .into());
    };

    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (", table);
    for (column, name) in columns.iter().copied().zip(&names) {
        sql.push_str(name);
        sql.push(' ');
        sql.push_str(&type_clause(column)?);
        sql.push_str(", ");
    }
    sql.push_str("PRIMARY KEY (");
    sql.push_str(identity);
    sql.push_str("))");
    Ok(sql)
}

/// `INSERT INTO ... VALUES (...)` over the insertable descriptors: named and
/// not auto-increment.
pub fn insert_statement(
    table: &str,
    columns: &[ColumnDescriptor],
    style: PlaceholderStyle,
) -> LogRowResult<InsertStatement> {
    validate_table_name(table)?;

    let mut names = Vec::new();
    for column in columns.iter().filter(|c| c.is_insertable()) {
        names.push(column_name(column)?.to_string());
    }
    ensure_unique_names(names.iter().map(String::as_str))?;
    if names.is_empty() {
        return Err(ConfigError::NoInsertableColumns {
            table: table.to_string(),
        }
        .into());
    }

    let placeholders: Vec<String> = names.iter().map(|n| style.placeholder(n)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    );
    Ok(InsertStatement {
        sql,
        columns: names,
        style,
    })
}

impl ColumnSet {
    pub fn create_table_statement(&self, table: &str) -> LogRowResult<String> {
        create_table_statement(table, self.columns())
    }

    pub fn insert_statement(
        &self,
        table: &str,
        style: PlaceholderStyle,
    ) -> LogRowResult<InsertStatement> {
        insert_statement(table, self.columns(), style)
    }
}

fn column_name(column: &ColumnDescriptor) -> LogRowResult<&str> {
    let name = match column.name() {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Err(match column.role() {
                Some(role) => ConfigError::MissingColumnName { role },
                None => ConfigError::MissingCustomColumnName,
            }
            .into())
        }
    };
    if !is_identifier(name) {
        return Err(ConfigError::InvalidValue {
            field: "column name".to_string(),
            value: name.to_string(),
            reason: "must contain only letters, digits, '_' or '$'".to_string(),
        }
        .into());
    }
    Ok(name)
}

/// Table names may be schema qualified (`logs.Events`).
fn validate_table_name(table: &str) -> LogRowResult<()> {
    if table.split('.').all(is_identifier) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: "table_name".to_string(),
        value: table.to_string(),
        reason: "must be a non-empty, optionally schema qualified identifier".to_string(),
    }
    .into())
}

/// Unquoted MySQL identifier.
fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnKind, ColumnRole, DataType, LogRowError};

    #[test]
    fn test_default_create_table() {
        let sql = ColumnSet::default().create_table_statement("Logs").unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS Logs (\
             Id INT NOT NULL AUTO_INCREMENT, \
             TimeStamp TIMESTAMP(6) DEFAULT CURRENT_TIMESTAMP(6), \
             Event TEXT, \
             Message TEXT, \
             Template TEXT, \
             Level VARCHAR(16), \
             Exception TEXT, \
             PRIMARY KEY (Id))"
        );
    }

    #[test]
    fn test_default_insert_named() {
        let insert = ColumnSet::default()
            .insert_statement("Logs", PlaceholderStyle::Named)
            .unwrap();
        assert_eq!(
            insert.sql(),
            "INSERT INTO Logs (TimeStamp, Event, Message, Template, Level, Exception) \
             VALUES (@TimeStamp, @Event, @Message, @Template, @Level, @Exception)"
        );
        assert_eq!(
            insert.columns(),
            ["TimeStamp", "Event", "Message", "Template", "Level", "Exception"]
        );
    }

    #[test]
    fn test_insert_positional() {
        let columns = [
            ColumnDescriptor::guid_id("Id"),
            ColumnDescriptor::message("Message"),
        ];
        let insert = insert_statement("app.Logs", &columns, PlaceholderStyle::Positional).unwrap();
        assert_eq!(insert.sql(), "INSERT INTO app.Logs (Id, Message) VALUES (?, ?)");
    }

    #[test]
    fn test_create_requires_exactly_one_identity() {
        let none = [ColumnDescriptor::message("Message")];
        assert_eq!(
            create_table_statement("Logs", &none).unwrap_err(),
            LogRowError::Config(ConfigError::IdentityColumnCount { count: 0 })
        );

        let two = [ColumnDescriptor::id("Id"), ColumnDescriptor::guid_id("Uid")];
        assert_eq!(
            create_table_statement("Logs", &two).unwrap_err(),
            LogRowError::Config(ConfigError::IdentityColumnCount { count: 2 })
        );
    }

    #[test]
    fn test_create_rejects_blank_names_and_duplicates() {
        let blank = ColumnDescriptor::message("  ");
        assert_eq!(
            create_table_statement("Logs", &[ColumnDescriptor::id("Id"), blank]).unwrap_err(),
            LogRowError::Config(ConfigError::MissingColumnName {
                role: ColumnRole::Message
            })
        );

        let dup = [
            ColumnDescriptor::id("Id"),
            ColumnDescriptor::message("Text"),
            ColumnDescriptor::custom("TEXT", DataType::text()),
        ];
        assert!(matches!(
            create_table_statement("Logs", &dup).unwrap_err(),
            LogRowError::Config(ConfigError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            insert_statement("Logs", &dup, PlaceholderStyle::Named).unwrap_err(),
            LogRowError::Config(ConfigError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_insert_skips_unnamed() {
        let mut unnamed = ColumnDescriptor::exception("Exception");
        unnamed.name = None;
        let insert = insert_statement(
            "Logs",
            &[ColumnDescriptor::message("Message"), unnamed],
            PlaceholderStyle::Named,
        )
        .unwrap();
        assert_eq!(insert.columns(), ["Message"]);
    }

    #[test]
    fn test_create_and_insert_skip_unnamed_alike() {
        let mut unnamed = ColumnDescriptor::exception("Exception");
        unnamed.name = None;
        let columns = [
            ColumnDescriptor::id("Id"),
            ColumnDescriptor::message("Message"),
            unnamed,
        ];
        let create = create_table_statement("Logs", &columns).unwrap();
        assert_eq!(
            create,
            "CREATE TABLE IF NOT EXISTS Logs (Id INT NOT NULL AUTO_INCREMENT, \
             Message TEXT, PRIMARY KEY (Id))"
        );
        let insert = insert_statement("Logs", &columns, PlaceholderStyle::Named).unwrap();
        assert_eq!(insert.sql(), "INSERT INTO Logs (Message) VALUES (@Message)");
    }

    #[test]
    fn test_insert_without_columns_fails() {
        let err = insert_statement("Logs", &[ColumnDescriptor::id("Id")], PlaceholderStyle::Named)
            .unwrap_err();
        assert!(matches!(
            err,
            LogRowError::Config(ConfigError::NoInsertableColumns { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let columns = [ColumnDescriptor::id("Id")];
        assert!(create_table_statement("", &columns).is_err());
        assert!(create_table_statement("Logs; DROP TABLE x", &columns).is_err());
        assert!(create_table_statement("a..b", &columns).is_err());

        let spaced = [
            ColumnDescriptor::id("Id"),
            ColumnDescriptor::custom("My Column", DataType::text()),
        ];
        assert!(create_table_statement("Logs", &spaced).is_err());

        let accented = [
            ColumnDescriptor::id("Id"),
            ColumnDescriptor::custom("Région", DataType::text()),
        ];
        assert!(create_table_statement("Logs", &accented).is_err());
        assert!(create_table_statement("Journal_é", &columns).is_err());
    }

    #[test]
    fn test_bind_checks_count_and_order() {
        let columns = [
            ColumnDescriptor::message("Message"),
            ColumnDescriptor::timestamp("At").with_kind(ColumnKind::UnixTime),
        ];
        let insert = insert_statement("Logs", &columns, PlaceholderStyle::Named).unwrap();

        let bound = insert
            .bind(vec![ColumnValue::from("hi"), ColumnValue::Integer(5)])
            .unwrap();
        assert_eq!(bound.sql, insert.sql());
        assert_eq!(bound.parameters[0].column, "Message");
        assert_eq!(bound.parameters[1].placeholder(bound.style), "@At");
        assert_eq!(bound.parameters[1].value, ColumnValue::Integer(5));

        assert_eq!(
            insert.bind(vec![ColumnValue::Null]).unwrap_err(),
            LogRowError::Config(ConfigError::ParameterCount {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_insert_is_deterministic() {
        let set = ColumnSet::builder()
            .with(ColumnDescriptor::custom("App", DataType::varchar(32)))
            .build()
            .unwrap();
        let first = set.insert_statement("Logs", PlaceholderStyle::Named).unwrap();
        let second = set.insert_statement("Logs", PlaceholderStyle::Named).unwrap();
        assert_eq!(first.sql(), second.sql());
    }
}
