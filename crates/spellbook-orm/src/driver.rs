//! The driver contract.
//!
//! A driver owns connection pooling and the wire protocol of one engine.
//! The ORM hands it compiled SQL with bound parameters and gets rows back;
//! nothing else crosses the boundary.

use std::future::Future;

use spellbook_core::{Dialect, SqlValue};

/// One result row: column name to wire value, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates a row from column/value pairs.
    #[must_use]
    pub const fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Returns the value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns the value of the first column.
    #[must_use]
    pub fn first(&self) -> Option<&SqlValue> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Iterates over column/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true for a row without columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for Row {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<S: Into<String>> FromIterator<(S, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, SqlValue)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

/// What a driver reports for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Returned rows.
    pub rows: Vec<Row>,
    /// Column names of the result set.
    pub fields: Vec<String>,
    /// Rows inserted, updated or deleted.
    ///
    /// Engines differ on upserts: MySQL reports 2 for a row taking the
    /// update branch. Only rely on it being non-zero.
    pub affected_rows: u64,
    /// Generated key reported by the engine, see
    /// [`InsertId`](spellbook_core::dialect::InsertId).
    pub last_insert_id: Option<i64>,
}

/// A database driver.
///
/// Errors are passed through to callers unmodified, wrapped in
/// [`OrmError::Database`](crate::OrmError::Database) with the SQL text and
/// timing attached. Implementations may write the async methods as
/// `async fn`.
pub trait Driver: Send + Sync {
    /// A pooled connection.
    type Connection: Send;

    /// The driver's error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the dialect SQL is compiled for.
    fn dialect(&self) -> &dyn Dialect;

    /// Quotes an identifier. Every statement resolved through this driver
    /// quotes its tables and columns here.
    fn escape_identifier(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }

    /// Acquires a connection from the pool.
    fn acquire(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Returns a connection to the pool.
    fn release(&self, conn: Self::Connection) {
        drop(conn);
    }

    /// Executes one statement.
    fn execute(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = Result<QueryResult, Self::Error>> + Send;
}
