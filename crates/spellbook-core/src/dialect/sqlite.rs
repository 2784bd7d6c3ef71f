//! SQLite dialect implementation.

use super::{Capabilities, Dialect, InsertId, UpsertStyle};

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            // UPDATE/DELETE ... LIMIT needs SQLITE_ENABLE_UPDATE_DELETE_LIMIT
            bounded_dml: false,
            native_boolean: false,
            returning: false,
            row_locking: false,
            conflict_target: true, // SQLite 3.24.0+
            multi_row_upsert: true,
            upsert: UpsertStyle::OnConflict,
            insert_id: InsertId::LastRow,
        }
    }

    fn identifier_quote(&self) -> char {
        '"' // SQLite also accepts backticks, but double quotes are standard
    }
}
