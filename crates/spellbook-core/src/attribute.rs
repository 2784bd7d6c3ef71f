//! Attribute metadata and the per-model attribute registry.

use std::fmt;
use std::sync::Arc;

use crate::coerce;
use crate::dialect::Dialect;
use crate::error::{Result, SpellError};
use crate::naming::snake_case;
use crate::types::DataType;
use crate::value::{SqlValue, Value};

type Getter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
type Setter = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Custom get/set transforms of one attribute.
///
/// Resolved once when the attribute is defined; instances call through the
/// stored closures on every accessor-aware read or write.
#[derive(Clone, Default)]
pub struct Accessor {
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl Accessor {
    /// Applies the getter, or returns the raw value.
    #[must_use]
    pub fn get(&self, raw: &Value) -> Value {
        self.getter.as_ref().map_or_else(|| raw.clone(), |getter| getter(raw))
    }

    /// Applies the setter, or returns the value as given.
    ///
    /// # Errors
    ///
    /// Returns the setter's message when it rejects the value.
    pub fn set(&self, value: Value) -> std::result::Result<Value, String> {
        match &self.setter {
            Some(setter) => setter(value),
            None => Ok(value),
        }
    }

    /// Returns true when a getter is installed.
    #[must_use]
    pub const fn has_getter(&self) -> bool {
        self.getter.is_some()
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// The automatically maintained timestamp attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    /// `createdAt` / `created_at`
    Created,
    /// `updatedAt` / `updated_at`
    Updated,
    /// `deletedAt` / `deleted_at`, makes the model paranoid.
    Deleted,
}

impl TimestampKind {
    /// Attribute names recognized for this kind.
    #[must_use]
    pub const fn names(self) -> [&'static str; 2] {
        match self {
            Self::Created => ["createdAt", "created_at"],
            Self::Updated => ["updatedAt", "updated_at"],
            Self::Deleted => ["deletedAt", "deleted_at"],
        }
    }
}

/// Metadata of one attribute.
///
/// ```rust
/// use spellbook_core::{Attribute, DataType, Value};
///
/// let attr = Attribute::new(DataType::String)
///     .column("nick_name")
///     .setter(|value| Ok(value.as_str().map_or(value.clone(), |s| Value::from(s.to_uppercase()))));
/// assert_eq!(attr.accessor().set(Value::from("yhorm")), Ok(Value::from("YHORM")));
/// ```
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    column: String,
    data_type: DataType,
    primary_key: bool,
    unique: bool,
    default_value: Option<Value>,
    accessor: Accessor,
}

impl Attribute {
    /// Creates an attribute of the given type. Name and column are filled in
    /// by [`AttributeRegistry::define`].
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        Self {
            name: String::new(),
            column: String::new(),
            data_type,
            primary_key: false,
            unique: false,
            default_value: None,
            accessor: Accessor::default(),
        }
    }

    /// Overrides the storage column, which otherwise is the snake_case of
    /// the attribute name.
    #[must_use]
    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    /// Marks the attribute as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the attribute unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the value new instances start with.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Installs a getter transform.
    #[must_use]
    pub fn getter(mut self, getter: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.accessor.getter = Some(Arc::new(getter));
        self
    }

    /// Installs a setter transform. Returning `Err` rejects the value.
    #[must_use]
    pub fn setter(
        mut self,
        setter: impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.accessor.setter = Some(Arc::new(setter));
        self
    }

    /// Returns the attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage column.
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column
    }

    /// Returns the semantic type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns true for the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Returns true for unique attributes.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the default value, if any.
    #[must_use]
    pub const fn initial_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Returns the accessor table entry.
    #[must_use]
    pub const fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    /// Casts a wire value read from this attribute's column.
    #[must_use]
    pub fn cast(&self, wire: SqlValue, dialect: &dyn Dialect) -> Value {
        coerce::cast(self.data_type, wire, dialect)
    }

    /// Uncasts a value bound for this attribute's column.
    #[must_use]
    pub fn uncast(&self, value: &Value, dialect: &dyn Dialect) -> SqlValue {
        coerce::uncast(self.data_type, value, dialect)
    }
}

impl From<DataType> for Attribute {
    fn from(data_type: DataType) -> Self {
        Self::new(data_type)
    }
}

/// The attribute table of one model, in definition order.
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    model: String,
    attributes: Vec<Attribute>,
}

impl AttributeRegistry {
    /// Creates an empty registry for `model`.
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Defines `name`, overwriting a previous definition of the same name.
    ///
    /// # Errors
    ///
    /// - [`SpellError::AttributeExists`] when another attribute already owns
    ///   the column
    /// - [`SpellError::DuplicatePrimaryKey`] when another attribute already is
    ///   the primary key
    pub fn define(&mut self, name: &str, attribute: impl Into<Attribute>) -> Result<&Attribute> {
        let mut attribute = attribute.into();
        attribute.name = name.to_string();
        if attribute.column.is_empty() {
            attribute.column = snake_case(name);
        }

        if let Some(owner) = self
            .attributes
            .iter()
            .find(|a| a.name != name && a.column == attribute.column)
        {
            return Err(SpellError::AttributeExists {
                model: self.model.clone(),
                name: owner.column.clone(),
            });
        }
        if attribute.primary_key {
            if let Some(existing) = self.attributes.iter().find(|a| a.primary_key && a.name != name) {
                return Err(SpellError::DuplicatePrimaryKey {
                    model: self.model.clone(),
                    existing: existing.name.clone(),
                    name: name.to_string(),
                });
            }
        }

        let index = match self.attributes.iter().position(|a| a.name == name) {
            Some(index) => {
                self.attributes[index] = attribute;
                index
            }
            None => {
                self.attributes.push(attribute);
                self.attributes.len() - 1
            }
        };
        Ok(&self.attributes[index])
    }

    /// Renames an attribute, keeping its column.
    ///
    /// # Errors
    ///
    /// - [`SpellError::AttributeExists`] when `new_name` is taken
    /// - [`SpellError::MissingAttribute`] when `old_name` is unknown
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.has_attribute(new_name) {
            return Err(SpellError::AttributeExists {
                model: self.model.clone(),
                name: new_name.to_string(),
            });
        }
        let model = self.model.clone();
        let attribute = self
            .attributes
            .iter_mut()
            .find(|a| a.name == old_name)
            .ok_or_else(|| SpellError::MissingAttribute {
                model,
                name: old_name.to_string(),
            })?;
        attribute.name = new_name.to_string();
        Ok(())
    }

    /// Changes the semantic type of an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SpellError::MissingAttribute`] for unknown names.
    pub fn retype(&mut self, name: &str, data_type: DataType) -> Result<()> {
        let model = self.model.clone();
        let attribute = self
            .attributes
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| SpellError::MissingAttribute {
                model,
                name: name.to_string(),
            })?;
        attribute.data_type = data_type;
        Ok(())
    }

    /// Maps an attribute name to its column; unknown names map to themselves.
    #[must_use]
    pub fn unalias<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).map_or(name, Attribute::column_name)
    }

    /// Returns true if `name` is a defined attribute. Never fails.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        !name.is_empty() && self.get(name).is_some()
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up an attribute by name, failing for unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`SpellError::MissingAttribute`] for unknown names.
    pub fn require(&self, name: &str) -> Result<&Attribute> {
        self.get(name).ok_or_else(|| SpellError::MissingAttribute {
            model: self.model.clone(),
            name: name.to_string(),
        })
    }

    /// Looks up an attribute by storage column.
    #[must_use]
    pub fn by_column(&self, column: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.column == column)
    }

    /// Looks up by attribute name first, then by column.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Attribute> {
        self.get(name).or_else(|| self.by_column(name))
    }

    /// Returns the primary key attribute.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.primary_key)
    }

    /// Returns the timestamp attribute of the given kind.
    #[must_use]
    pub fn timestamp(&self, kind: TimestampKind) -> Option<&Attribute> {
        kind.names().iter().find_map(|name| self.get(name))
    }

    /// Returns true when the model has a deleted marker.
    #[must_use]
    pub fn is_paranoid(&self) -> bool {
        self.timestamp(TimestampKind::Deleted).is_some()
    }

    /// Iterates over attributes in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }
}
