//! Spell resolution: compile, acquire, execute, release, log.

use std::fmt;
use std::time::Instant;

use spellbook_core::{compile, AttributeRegistry, Capabilities, Dialect, LockMode, Spell, SqlValue};
use tracing::{debug, error};

use crate::driver::{Driver, QueryResult};
use crate::error::{OrmError, Result};

/// Compiles `spell` and runs it.
///
/// Identifiers are quoted by [`Driver::escape_identifier`]. Compilation
/// failures are returned before the driver is contacted.
pub async fn execute<D: Driver>(
    driver: &D,
    conn: Option<&mut D::Connection>,
    spell: &Spell,
    registry: &AttributeRegistry,
) -> Result<QueryResult> {
    let (sql, params) = compile(spell, registry, &DriverDialect { driver })?;
    run(driver, conn, &sql, &params).await
}

/// The driver's dialect with identifier quoting taken from the driver.
struct DriverDialect<'a, D> {
    driver: &'a D,
}

impl<D: Driver> fmt::Debug for DriverDialect<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DriverDialect")
            .field(&self.driver.dialect().name())
            .finish()
    }
}

impl<D: Driver> Dialect for DriverDialect<'_, D> {
    fn name(&self) -> &'static str {
        self.driver.dialect().name()
    }

    fn capabilities(&self) -> Capabilities {
        self.driver.dialect().capabilities()
    }

    fn identifier_quote(&self) -> char {
        self.driver.dialect().identifier_quote()
    }

    fn placeholder(&self, index: usize) -> String {
        self.driver.dialect().placeholder(index)
    }

    fn quote_identifier(&self, name: &str) -> String {
        self.driver.escape_identifier(name)
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        self.driver.dialect().limit_offset(limit, offset)
    }

    fn lock_clause(&self, mode: LockMode) -> &'static str {
        self.driver.dialect().lock_clause(mode)
    }

    fn empty_insert(&self) -> &'static str {
        self.driver.dialect().empty_insert()
    }
}

/// Runs SQL on the supplied connection, or on one acquired for this call
/// and released on every exit path.
///
/// # Errors
///
/// Returns [`OrmError::Database`] with the SQL and elapsed time attached
/// when the driver fails.
pub async fn run<D: Driver>(
    driver: &D,
    conn: Option<&mut D::Connection>,
    sql: &str,
    params: &[SqlValue],
) -> Result<QueryResult> {
    let start = Instant::now();
    let outcome = match conn {
        Some(conn) => driver.execute(conn, sql, params).await,
        None => match driver.acquire().await {
            Ok(mut conn) => {
                let outcome = driver.execute(&mut conn, sql, params).await;
                driver.release(conn);
                outcome
            }
            Err(e) => Err(e),
        },
    };
    let elapsed = start.elapsed();
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(result) => {
            debug!(
                sql,
                params = params.len(),
                affected_rows = result.affected_rows,
                elapsed_ms,
                "query"
            );
            Ok(result)
        }
        Err(e) => {
            error!(sql, params = params.len(), elapsed_ms, error = %e, "query failed");
            Err(OrmError::Database {
                sql: sql.to_string(),
                elapsed,
                source: Box::new(e),
            })
        }
    }
}
