//! # spellbook-core
//!
//! The pure half of the spellbook data mapper: nothing in this crate talks to
//! a database.
//!
//! This crate provides:
//! - [`Value`] and [`SqlValue`], the semantic and wire representations of a
//!   column value
//! - the coercion engine ([`coerce`]) that casts between the two per
//!   [`DataType`] and [`Dialect`]
//! - the [`AttributeRegistry`] holding per-model attribute metadata
//! - [`Spell`], an immutable description of one query or mutation
//! - the spell compiler ([`compile`]) producing parameterized SQL per dialect
//!
//! ## Compiling a spell
//!
//! ```rust
//! use spellbook_core::dialect::MysqlDialect;
//! use spellbook_core::{compile, Attribute, AttributeRegistry, Condition, DataType, Spell};
//!
//! let mut registry = AttributeRegistry::new("Post");
//! registry.define("id", Attribute::new(DataType::BigInt).primary_key()).unwrap();
//! registry.define("title", Attribute::new(DataType::String)).unwrap();
//! registry
//!     .define("updatedAt", Attribute::new(DataType::DateTime).column("gmt_modified"))
//!     .unwrap();
//!
//! let spell = Spell::select("articles")
//!     .filter(Condition::like("title", "%Post%"))
//!     .order("updatedAt DESC")
//!     .limit(10);
//!
//! let (sql, params) = compile(&spell, &registry, &MysqlDialect).unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM `articles` WHERE `title` LIKE ? ORDER BY `gmt_modified` DESC LIMIT 10"
//! );
//! assert_eq!(params.len(), 1);
//! ```
//!
//! ## Soft deletes
//!
//! A registry with a `deletedAt` (or `deleted_at`) attribute is *paranoid*:
//! reads and updates get a `deleted_at IS NULL` predicate and deletes become
//! updates of the marker, unless the spell is `unscoped`, `unparanoid` or
//! `force`d.

pub mod attribute;
pub mod coerce;
pub mod compiler;
pub mod dialect;
mod error;
pub mod naming;
pub mod spell;
pub mod types;
pub mod value;

pub use attribute::{Accessor, Attribute, AttributeRegistry, TimestampKind};
pub use compiler::compile;
pub use dialect::{Capabilities, Dialect, DialectKind, Feature};
pub use error::{Result, SpellError};
pub use spell::{
    Aggregate, Command, CompareOp, Condition, Join, JoinKind, LockMode, OrderBy, OrderDirection,
    Spell, UpdateOnDuplicate, WriteOptions,
};
pub use types::DataType;
pub use value::{SqlValue, Value, Values};
