//! Error types for connecting the SQLite driver.

use spellbook_orm::OrmError;

/// Errors raised while setting up a [`SqliteDriver`](crate::SqliteDriver).
///
/// Statement failures are not reported here: they reach callers as
/// [`OrmError::Database`] with the `sqlx::Error` as source.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// The configuration is invalid or names another dialect.
    #[error(transparent)]
    Config(#[from] OrmError),

    /// The pool could not be opened.
    #[error("Failed to connect: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Result type for driver setup.
pub type Result<T> = std::result::Result<T, SqliteError>;
