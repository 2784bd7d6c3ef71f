//! MySQL dialect implementation.

use super::{Capabilities, Dialect, InsertId, UpsertStyle};
use crate::spell::LockMode;

/// MySQL dialect.
///
/// The only shipped dialect with bounded UPDATE/DELETE. An upsert that takes
/// the update branch reports two affected rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            bounded_dml: true,
            native_boolean: false, // BOOLEAN is TINYINT(1)
            returning: false,
            row_locking: true,
            conflict_target: false,
            multi_row_upsert: true,
            upsert: UpsertStyle::OnDuplicateKey,
            insert_id: InsertId::FirstRow,
        }
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
            (None, Some(offset)) => Some(format!("LIMIT {} OFFSET {offset}", u64::MAX)),
        }
    }

    fn lock_clause(&self, mode: LockMode) -> &'static str {
        match mode {
            LockMode::Update => "FOR UPDATE",
            LockMode::Share => "LOCK IN SHARE MODE",
        }
    }

    fn empty_insert(&self) -> &'static str {
        "() VALUES ()"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_dialect() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.name(), "mysql");
        assert_eq!(dialect.identifier_quote(), '`');
        assert_eq!(dialect.lock_clause(LockMode::Share), "LOCK IN SHARE MODE");
        assert_eq!(dialect.capabilities().insert_id, InsertId::FirstRow);
    }
}
