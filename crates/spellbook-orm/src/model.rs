//! Model definitions.
//!
//! A [`Model`] binds a name, a table and an [`AttributeRegistry`]. Models are
//! built once, wrapped in an [`Arc`] and shared by every instance and query
//! created from them.

use std::sync::Arc;

use spellbook_core::naming::table_name;
use spellbook_core::{Attribute, AttributeRegistry, DataType, Dialect, TimestampKind, Values};
use tracing::trace;

use crate::driver::Row;
use crate::error::{OrmError, Result};
use crate::instance::Instance;
use crate::manager::Manager;

/// A model definition.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use spellbook_core::{Attribute, DataType};
/// use spellbook_orm::Model;
///
/// let post = Model::builder("Post")
///     .table("articles")
///     .attribute("title", DataType::String)
///     .attribute("updatedAt", Attribute::new(DataType::DateTime).column("gmt_modified"))
///     .build()
///     .unwrap();
///
/// assert_eq!(post.table(), "articles");
/// assert_eq!(post.primary_key(), "id");
/// assert_eq!(post.unalias("updatedAt"), "gmt_modified");
/// let post = Arc::new(post);
/// let _objects = post.objects();
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    table: String,
    registry: AttributeRegistry,
}

impl Model {
    /// Starts the definition of a model.
    #[must_use]
    pub fn builder(name: &str) -> ModelBuilder {
        ModelBuilder {
            name: name.to_string(),
            table: None,
            registry: AttributeRegistry::new(name),
            error: None,
        }
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the attribute table.
    #[must_use]
    pub const fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Returns the primary key attribute name, empty if a redefinition
    /// dropped the key.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.registry.primary_key().map_or("", Attribute::name)
    }

    /// Returns the primary key column.
    #[must_use]
    pub fn primary_column(&self) -> &str {
        self.registry.primary_key().map_or("", Attribute::column_name)
    }

    /// Maps an attribute name to its column.
    #[must_use]
    pub fn unalias<'a>(&'a self, name: &'a str) -> &'a str {
        self.registry.unalias(name)
    }

    /// Returns true if `name` is an attribute of this model.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.registry.has_attribute(name)
    }

    /// Returns true if the model has a deleted marker.
    #[must_use]
    pub fn is_paranoid(&self) -> bool {
        self.registry.is_paranoid()
    }

    /// Returns the name of the timestamp attribute of the given kind.
    #[must_use]
    pub fn timestamp(&self, kind: TimestampKind) -> Option<&str> {
        self.registry.timestamp(kind).map(Attribute::name)
    }

    /// Redefines an existing attribute. The column is kept unless the new
    /// definition names one.
    ///
    /// # Errors
    ///
    /// - [`OrmError::MissingAttribute`] when `name` is not defined
    /// - the definition errors of [`AttributeRegistry::define`]
    pub fn attribute(&mut self, name: &str, attribute: impl Into<Attribute>) -> Result<()> {
        let column = self.registry.require(name)?.column_name().to_string();
        let mut attribute = attribute.into();
        if attribute.column_name().is_empty() {
            attribute = attribute.column(&column);
        }
        self.registry.define(name, attribute)?;
        Ok(())
    }

    /// Renames an attribute, keeping its column.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::AttributeExists`] or [`OrmError::MissingAttribute`].
    pub fn rename_attribute(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        Ok(self.registry.rename(old_name, new_name)?)
    }

    /// Returns the model-level query helpers.
    #[must_use]
    pub fn objects(self: &Arc<Self>) -> Manager {
        Manager::new(Arc::clone(self))
    }

    /// Builds a persisted instance from a result row.
    #[must_use]
    pub fn instantiate(self: &Arc<Self>, row: &Row, dialect: &dyn Dialect) -> Instance {
        Instance::instantiate(Arc::clone(self), row, dialect)
    }

    /// Runs attribute setters over a write payload, dropping keys that are
    /// not attributes.
    pub(crate) fn assign(&self, values: Values) -> Result<Values> {
        let mut assigned = Values::new();
        for (name, value) in values {
            match self.registry.get(&name) {
                Some(attribute) => {
                    let value = attribute.accessor().set(value).map_err(OrmError::Validation)?;
                    assigned.insert(name, value);
                }
                None => trace!(model = %self.name, attribute = %name, "ignoring non-attribute"),
            }
        }
        Ok(assigned)
    }

    pub(crate) fn missing_attribute(&self, name: &str) -> OrmError {
        OrmError::MissingAttribute {
            model: self.name.clone(),
            name: name.to_string(),
        }
    }
}

/// Builder returned by [`Model::builder`].
///
/// Definition errors are held back until [`ModelBuilder::build`].
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    table: Option<String>,
    registry: AttributeRegistry,
    error: Option<OrmError>,
}

impl ModelBuilder {
    /// Overrides the table name.
    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Defines an attribute.
    #[must_use]
    pub fn attribute(mut self, name: &str, attribute: impl Into<Attribute>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.registry.define(name, attribute) {
                self.error = Some(e.into());
            }
        }
        self
    }

    /// Finishes the definition. Without a declared primary key, `id`
    /// becomes one, defined as BIGINT if absent.
    ///
    /// # Errors
    ///
    /// Returns the first definition error.
    pub fn build(mut self) -> Result<Model> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.registry.primary_key().is_none() {
            let id = self
                .registry
                .get("id")
                .cloned()
                .unwrap_or_else(|| Attribute::new(DataType::BigInt));
            self.registry.define("id", id.primary_key())?;
        }
        let table = self.table.unwrap_or_else(|| table_name(&self.name));
        Ok(Model {
            name: self.name,
            table,
            registry: self.registry,
        })
    }
}
