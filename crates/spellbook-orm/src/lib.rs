//! # spellbook-orm
//!
//! Models, instances and spell resolution on top of `spellbook-core`.
//!
//! This crate provides:
//! - the [`Driver`] contract a database backend implements
//! - [`Model`] definitions built from attribute metadata
//! - [`Instance`], which tracks current, saved and previously saved values
//! - [`QuerySet`] for lazy, chainable queries and mutations of one model
//! - [`Manager`] for model-level helpers (`model.objects()`)
//! - [`DatabaseConfig`] for driver configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use spellbook_core::{values, Attribute, Condition, DataType};
//! use spellbook_orm::Model;
//!
//! let post = Arc::new(
//!     Model::builder("Post")
//!         .table("articles")
//!         .attribute("title", DataType::String)
//!         .attribute("createdAt", DataType::DateTime)
//!         .attribute("updatedAt", Attribute::new(DataType::DateTime).column("gmt_modified"))
//!         .attribute("deletedAt", DataType::DateTime)
//!         .build()?,
//! );
//!
//! // INSERT, then UPDATE of the changed attributes only
//! let mut first = post.objects().create(&driver, values! { "title" => "A" }).await?;
//! first.set_attribute("title", "B")?;
//! assert_eq!(first.changed(), ["title"]);
//! first.save(&driver).await?;
//! assert!(first.changes().is_empty());
//! assert!(first.previous_changed("title"));
//!
//! // Soft delete: the row stays, default scopes hide it
//! first.remove(&driver, false).await?;
//! assert_eq!(post.objects().count(&driver).await?, 0);
//! assert_eq!(post.objects().unparanoid().count(&driver).await?, 1);
//!
//! let recent = post
//!     .objects()
//!     .find(Condition::like("title", "%B%"))
//!     .order("createdAt DESC")
//!     .limit(10)
//!     .all(&driver)
//!     .await?;
//! ```
//!
//! ## Errors
//!
//! Every failure except [`OrmError::Database`] is detected before SQL is
//! sent, and a failed write leaves the instance exactly as it was.

pub mod collection;
pub mod config;
pub mod driver;
mod error;
pub mod instance;
pub mod manager;
pub mod model;
mod persistence;
pub mod queryset;
mod resolve;

pub use collection::Collection;
pub use config::DatabaseConfig;
pub use driver::{Driver, QueryResult, Row};
pub use error::{OrmError, Result, MISSING_PRIMARY_KEY, NOT_PERSISTED};
pub use instance::{Changes, Instance};
pub use manager::Manager;
pub use model::{Model, ModelBuilder};
pub use queryset::QuerySet;
pub use resolve::run;
