//! SQLite driver on a `sqlx` pool.

use std::str::FromStr;

use spellbook_core::dialect::SqliteDialect;
use spellbook_core::{Dialect, DialectKind, SqlValue};
use spellbook_orm::{DatabaseConfig, Driver, OrmError, QueryResult, Row};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::info;

use crate::error::Result;

const MEMORY: &str = ":memory:";

/// A [`Driver`] for SQLite.
///
/// Statements returning rows (`SELECT`, `RETURNING`) are fetched; everything
/// else reports its affected rows and, for inserts, the last row id.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool from `config`. The database file is created when
    /// missing; `:memory:` databases get a single connection.
    ///
    /// # Errors
    ///
    /// - [`SqliteError::Config`](crate::SqliteError::Config) when the
    ///   configuration names another dialect or no database
    /// - [`SqliteError::Connect`](crate::SqliteError::Connect) when the
    ///   pool cannot be opened
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let kind = config.dialect_kind()?;
        if kind != DialectKind::Sqlite {
            return Err(OrmError::Config(format!("expected sqlite, got {kind}")).into());
        }
        let database = config
            .database_name()
            .ok_or_else(|| OrmError::Config("missing database".to_string()))?;

        let (options, max_connections) = if database == MEMORY {
            (SqliteConnectOptions::from_str(MEMORY)?, 1)
        } else {
            let options = SqliteConnectOptions::new()
                .filename(database)
                .create_if_missing(true);
            (options, config.connection_limit.max(1))
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await?;

        info!(database, max_connections, "connected to sqlite");
        Ok(Self::new(pool))
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Connect`](crate::SqliteError::Connect) when
    /// the pool cannot be opened.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::sqlite(MEMORY)).await
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Driver for SqliteDriver {
    type Connection = PoolConnection<Sqlite>;
    type Error = sqlx::Error;

    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }

    async fn acquire(&self) -> std::result::Result<Self::Connection, sqlx::Error> {
        self.pool.acquire().await
    }

    async fn execute(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        params: &[SqlValue],
    ) -> std::result::Result<QueryResult, sqlx::Error> {
        let query = params.iter().fold(sqlx::query(sql), bind);

        if returns_rows(sql) {
            let fetched = query.fetch_all(&mut **conn).await?;
            let fields = fetched
                .first()
                .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
                .unwrap_or_default();
            let rows = fetched.iter().map(decode).collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(QueryResult {
                affected_rows: rows.len() as u64,
                rows,
                fields,
                last_insert_id: None,
            });
        }

        let done = query.execute(&mut **conn).await?;
        Ok(QueryResult {
            affected_rows: done.rows_affected(),
            last_insert_id: starts_with_keyword(sql, "INSERT").then(|| done.last_insert_rowid()),
            ..QueryResult::default()
        })
    }
}

fn bind<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Blob(b) => query.bind(b.clone()),
    }
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.split_whitespace()
        .next()
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
}

fn returns_rows(sql: &str) -> bool {
    ["SELECT", "WITH", "PRAGMA", "VALUES"]
        .iter()
        .any(|keyword| starts_with_keyword(sql, keyword))
        || sql.contains(" RETURNING ")
}

/// Decodes a row by the storage class of each value.
fn decode(row: &SqliteRow) -> std::result::Result<Row, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let type_info = raw.type_info();
            match type_info.name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get(index)?),
                "REAL" | "NUMERIC" => SqlValue::Float(row.try_get(index)?),
                "BLOB" => SqlValue::Blob(row.try_get(index)?),
                "TEXT" => SqlValue::Text(row.try_get(index)?),
                _ => SqlValue::Text(row.try_get_unchecked(index)?),
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(Row::new(columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT * FROM \"users\""));
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("INSERT INTO \"users\" (\"email\") VALUES (?) RETURNING \"id\""));
        assert!(!returns_rows("INSERT INTO \"users\" (\"email\") VALUES (?)"));
        assert!(!returns_rows("UPDATE \"users\" SET \"email\" = ?"));
    }

    #[tokio::test]
    async fn test_execute_and_decode() {
        let driver = SqliteDriver::in_memory().await.unwrap();
        let mut conn = driver.acquire().await.unwrap();

        driver
            .execute(&mut conn, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB)", &[])
            .await
            .unwrap();
        let result = driver
            .execute(
                &mut conn,
                "INSERT INTO t (name, score, data) VALUES (?, ?, ?)",
                &[
                    SqlValue::Text("a".into()),
                    SqlValue::Float(1.5),
                    SqlValue::Blob(vec![1, 2]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let result = driver
            .execute(&mut conn, "SELECT id, name, score, data, NULL AS nothing FROM t", &[])
            .await
            .unwrap();
        assert_eq!(result.fields, ["id", "name", "score", "data", "nothing"]);
        let row = &result.rows[0];
        assert_eq!(row.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get("name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(row.get("score"), Some(&SqlValue::Float(1.5)));
        assert_eq!(row.get("data"), Some(&SqlValue::Blob(vec![1, 2])));
        assert_eq!(row.get("nothing"), Some(&SqlValue::Null));
    }

    #[tokio::test]
    async fn test_connect_rejects_other_dialects() {
        let config = DatabaseConfig {
            dialect: "mysql".to_string(),
            ..DatabaseConfig::sqlite(MEMORY)
        };
        let err = SqliteDriver::connect(&config).await.unwrap_err();
        assert!(matches!(err, crate::SqliteError::Config(OrmError::Config(_))));
    }
}
