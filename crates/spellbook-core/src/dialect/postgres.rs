//! PostgreSQL dialect implementation.

use super::{Capabilities, Dialect, InsertId, UpsertStyle};

/// PostgreSQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            bounded_dml: false,
            native_boolean: true,
            returning: true,
            row_locking: true,
            conflict_target: true,
            multi_row_upsert: true,
            upsert: UpsertStyle::OnConflict,
            insert_id: InsertId::Returning,
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
            (None, Some(offset)) => Some(format!("OFFSET {offset}")),
        }
    }
}
