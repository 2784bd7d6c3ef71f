//! SQL dialect support.
//!
//! Engines differ in quoting, placeholders and, more importantly, in what
//! they can express at all. Each dialect reports a [`Capabilities`] table
//! that the compiler consults; a spell asking for something the table
//! denies fails with [`SpellError::Capability`](crate::SpellError::Capability)
//! before any SQL is produced.

mod mysql;
mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::spell::LockMode;

/// How an engine spells insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `INSERT ... ON DUPLICATE KEY UPDATE col = VALUES(col)`
    OnDuplicateKey,
    /// `INSERT ... ON CONFLICT (target) DO UPDATE SET col = excluded.col`
    OnConflict,
}

/// Where the generated key of an insert comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertId {
    /// The driver reports the id of the first row of a multi-row insert.
    FirstRow,
    /// The driver reports the id of the last row of a multi-row insert.
    LastRow,
    /// Ids come back through a `RETURNING` clause.
    Returning,
}

/// Capability flags of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `ORDER BY`/`LIMIT` on UPDATE and DELETE.
    pub bounded_dml: bool,
    /// A native boolean type; otherwise booleans travel as `0`/`1`.
    pub native_boolean: bool,
    /// `RETURNING` on INSERT.
    pub returning: bool,
    /// `FOR UPDATE`/`FOR SHARE` row locks.
    pub row_locking: bool,
    /// An explicit conflict target (`uniqueKeys`) on upsert.
    pub conflict_target: bool,
    /// Upsert of more than one row in a single statement.
    pub multi_row_upsert: bool,
    /// Upsert syntax.
    pub upsert: UpsertStyle,
    /// Origin of generated keys.
    pub insert_id: InsertId,
}

/// A construct a dialect may be unable to express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// `ORDER BY`/`LIMIT` on UPDATE or DELETE.
    BoundedDml,
    /// `OFFSET` on UPDATE or DELETE.
    DmlOffset,
    /// Row locking clauses.
    RowLocking,
    /// Explicit upsert conflict target.
    ConflictTarget,
    /// Multi-row upsert.
    MultiRowUpsert,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BoundedDml => "ORDER BY/LIMIT on UPDATE or DELETE",
            Self::DmlOffset => "OFFSET on UPDATE or DELETE",
            Self::RowLocking => "row locking",
            Self::ConflictTarget => "an explicit upsert conflict target",
            Self::MultiRowUpsert => "multi-row upsert",
        };
        f.write_str(text)
    }
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the capability table.
    fn capabilities(&self) -> Capabilities;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the placeholder for the parameter at `index` (1-based).
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        String::from("?")
    }

    /// Quotes an identifier, one segment at a time for qualified names.
    ///
    /// Embedded quote characters are doubled; `*` is left bare.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        name.split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    let escaped = part.replace(quote, &format!("{quote}{quote}"));
                    format!("{quote}{escaped}{quote}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Renders the LIMIT/OFFSET tail of a SELECT.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
            (None, Some(offset)) => Some(format!("LIMIT -1 OFFSET {offset}")),
        }
    }

    /// Renders a row lock clause.
    fn lock_clause(&self, mode: LockMode) -> &'static str {
        match mode {
            LockMode::Update => "FOR UPDATE",
            LockMode::Share => "FOR SHARE",
        }
    }

    /// Renders the body of an INSERT that carries no columns.
    fn empty_insert(&self) -> &'static str {
        "DEFAULT VALUES"
    }
}

/// The dialects shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    /// MySQL and compatible engines.
    Mysql,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
}

impl DialectKind {
    /// Returns the dialect implementation.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Mysql => &MysqlDialect,
            Self::Postgres => &PostgresDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqliteDialect.quote_identifier("title"), "\"title\"");
        assert_eq!(MysqlDialect.quote_identifier("posts.title"), "`posts`.`title`");
        assert_eq!(MysqlDialect.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(PostgresDialect.quote_identifier("posts.*"), "\"posts\".*");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(MysqlDialect.placeholder(3), "?");
        assert_eq!(SqliteDialect.placeholder(3), "?");
        assert_eq!(PostgresDialect.placeholder(3), "$3");
    }

    #[test]
    fn test_capability_table() {
        assert!(MysqlDialect.capabilities().bounded_dml);
        assert!(!PostgresDialect.capabilities().bounded_dml);
        assert!(!SqliteDialect.capabilities().bounded_dml);

        assert!(!MysqlDialect.capabilities().native_boolean);
        assert!(PostgresDialect.capabilities().native_boolean);

        assert!(!MysqlDialect.capabilities().conflict_target);
        assert!(!SqliteDialect.capabilities().row_locking);
        assert_eq!(
            MysqlDialect.capabilities().upsert,
            UpsertStyle::OnDuplicateKey
        );
        assert_eq!(SqliteDialect.capabilities().upsert, UpsertStyle::OnConflict);
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(SqliteDialect.limit_offset(None, None), None);
        assert_eq!(
            SqliteDialect.limit_offset(None, Some(5)).as_deref(),
            Some("LIMIT -1 OFFSET 5")
        );
        assert_eq!(
            MysqlDialect.limit_offset(None, Some(5)).as_deref(),
            Some("LIMIT 18446744073709551615 OFFSET 5")
        );
        assert_eq!(
            PostgresDialect.limit_offset(None, Some(5)).as_deref(),
            Some("OFFSET 5")
        );
    }

    #[test]
    fn test_dialect_kind_from_str() {
        assert_eq!("MySQL".parse::<DialectKind>(), Ok(DialectKind::Mysql));
        assert_eq!("pg".parse::<DialectKind>(), Ok(DialectKind::Postgres));
        assert_eq!("sqlite3".parse::<DialectKind>(), Ok(DialectKind::Sqlite));
        assert!("oracle".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::Postgres.dialect().name(), "postgres");
    }
}
