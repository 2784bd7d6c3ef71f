//! # spellbook-sqlite
//!
//! A [`Driver`](spellbook_orm::Driver) for SQLite built on a `sqlx` pool.
//!
//! ```ignore
//! use spellbook_orm::DatabaseConfig;
//! use spellbook_sqlite::SqliteDriver;
//!
//! let driver = SqliteDriver::connect(&DatabaseConfig::sqlite("blog.db")).await?;
//! let posts = post.objects().order("-id").limit(10).all(&driver).await?;
//! ```

mod driver;
mod error;

pub use driver::SqliteDriver;
pub use error::{Result, SqliteError};
