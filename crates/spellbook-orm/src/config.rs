//! Database connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use spellbook_core::{Dialect, DialectKind};

use crate::error::{OrmError, Result};

fn default_dialect() -> String {
    DialectKind::Mysql.as_str().to_string()
}

const fn default_connection_limit() -> u32 {
    10
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Options a driver is created from.
///
/// Field names follow the camelCase keys of a JSON configuration file:
///
/// ```rust
/// use spellbook_orm::DatabaseConfig;
///
/// let config = DatabaseConfig::from_json(
///     r#"{ "dialect": "sqlite", "database": "/tmp/blog.sqlite3", "connectionLimit": 4 }"#,
/// )
/// .unwrap();
/// assert_eq!(config.connection_limit, 4);
/// assert_eq!(config.database_name(), Some("/tmp/blog.sqlite3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// `mysql`, `postgres` or `sqlite`.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Database name, or file path for SQLite.
    #[serde(default)]
    pub database: Option<String>,
    /// Server host.
    #[serde(default)]
    pub host: Option<String>,
    /// Server port.
    #[serde(default)]
    pub port: Option<u16>,
    /// User name.
    #[serde(default)]
    pub user: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Takes precedence over `database` when locating the database.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Upper bound of pooled connections.
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
    /// Connection acquisition timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms", rename = "connectTimeout")]
    pub connect_timeout_ms: u64,
    /// Connection character set.
    #[serde(default)]
    pub charset: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            database: None,
            host: None,
            port: None,
            user: None,
            password: None,
            app_name: None,
            connection_limit: default_connection_limit(),
            connect_timeout_ms: default_connect_timeout_ms(),
            charset: None,
        }
    }
}

impl DatabaseConfig {
    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Config`] for malformed JSON or an unknown dialect.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OrmError::Config(e.to_string()))?;
        config.dialect_kind()?;
        Ok(config)
    }

    /// Configuration of a SQLite database at `path` (`:memory:` included).
    #[must_use]
    pub fn sqlite(path: &str) -> Self {
        Self {
            dialect: DialectKind::Sqlite.as_str().to_string(),
            database: Some(path.to_string()),
            ..Self::default()
        }
    }

    /// Returns the database to connect to, `app_name` first.
    #[must_use]
    pub fn database_name(&self) -> Option<&str> {
        self.app_name.as_deref().or(self.database.as_deref())
    }

    /// Parses the dialect name.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Config`] for unknown dialects.
    pub fn dialect_kind(&self) -> Result<DialectKind> {
        self.dialect.parse().map_err(OrmError::Config)
    }

    /// Returns the dialect implementation.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Config`] for unknown dialects.
    pub fn dialect(&self) -> Result<&'static dyn Dialect> {
        self.dialect_kind().map(DialectKind::dialect)
    }

    /// Returns the acquisition timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
