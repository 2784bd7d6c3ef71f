//! Model instances and dirty tracking.
//!
//! An [`Instance`] keeps three snapshots of its attribute values:
//!
//! - `current`, the values callers read and assign
//! - `saved`, the values as of the last successful load or write (`None`
//!   until the instance is persisted)
//! - `previous`, the `saved` snapshot as it was before the most recent write
//!
//! Snapshots only rotate after a write succeeded, so `changes()` always
//! reflects what is actually stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use spellbook_core::{coerce, Dialect, Value, Values};

use crate::driver::Row;
use crate::error::{OrmError, Result};
use crate::model::Model;

static NULL: Value = Value::Null;

/// Attribute name to `(before, after)`.
pub type Changes = BTreeMap<String, (Value, Value)>;

/// One row of a model, loaded or about to be created.
#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) model: Arc<Model>,
    pub(crate) current: Values,
    pub(crate) saved: Option<Values>,
    pub(crate) previous: Option<Values>,
    pub(crate) ad_hoc: Values,
}

impl Instance {
    /// Creates an unsaved instance.
    ///
    /// Attribute defaults are applied first, then `values` through each
    /// attribute's setter. Keys that are not attributes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when a setter rejects a value.
    pub fn new(model: Arc<Model>, values: Values) -> Result<Self> {
        let mut current: Values = model
            .registry()
            .iter()
            .filter_map(|a| a.initial_value().map(|v| (a.name().to_string(), v.clone())))
            .collect();
        current.extend(model.assign(values)?);
        Ok(Self {
            model,
            current,
            saved: None,
            previous: None,
            ad_hoc: Values::new(),
        })
    }

    /// Builds a persisted instance from a result row.
    ///
    /// Known columns are cast into `current` and `saved`. Other columns are
    /// typed heuristically and kept apart, see [`Instance::ad_hoc`].
    #[must_use]
    pub fn instantiate(model: Arc<Model>, row: &Row, dialect: &dyn Dialect) -> Self {
        let registry = model.registry();
        let mut current = Values::new();
        let mut ad_hoc = Values::new();
        for (column, wire) in row.iter() {
            match registry.by_column(column).or_else(|| registry.get(column)) {
                Some(attribute) => {
                    current.insert(
                        attribute.name().to_string(),
                        attribute.cast(wire.clone(), dialect),
                    );
                }
                None => {
                    ad_hoc.insert(column.to_string(), coerce::guess(wire.clone()));
                }
            }
        }
        Self {
            model,
            saved: Some(current.clone()),
            current,
            previous: None,
            ad_hoc,
        }
    }

    /// Returns the model.
    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Returns true until the instance was loaded or saved.
    #[must_use]
    pub const fn is_new_record(&self) -> bool {
        self.saved.is_none()
    }

    /// Reads the raw value of an attribute.
    ///
    /// Unassigned attributes of a new instance read as null.
    ///
    /// # Errors
    ///
    /// - [`OrmError::MissingAttribute`] when `name` is not an attribute
    /// - [`OrmError::UnsetAttribute`] when a persisted instance was loaded
    ///   without this attribute
    pub fn attribute(&self, name: &str) -> Result<&Value> {
        if !self.model.has_attribute(name) {
            return Err(self.model.missing_attribute(name));
        }
        match self.current.get(name) {
            Some(value) => Ok(value),
            None if self.is_new_record() => Ok(&NULL),
            None => Err(self.unset_attribute(name)),
        }
    }

    /// Reads an attribute through its getter.
    ///
    /// # Errors
    ///
    /// See [`Instance::attribute`].
    pub fn get(&self, name: &str) -> Result<Value> {
        let value = self.attribute(name)?;
        let attribute = self.model.registry().require(name)?;
        Ok(attribute.accessor().get(value))
    }

    /// Assigns the raw value of an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::MissingAttribute`] when `name` is not an attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        if !self.model.has_attribute(name) {
            return Err(self.model.missing_attribute(name));
        }
        self.current.insert(name.to_string(), value.into());
        Ok(self)
    }

    /// Assigns an attribute through its setter.
    ///
    /// # Errors
    ///
    /// - [`OrmError::MissingAttribute`] when `name` is not an attribute
    /// - [`OrmError::Validation`] when the setter rejects the value
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let attribute = self.model.registry().require(name)?;
        let value = attribute
            .accessor()
            .set(value.into())
            .map_err(OrmError::Validation)?;
        self.current.insert(name.to_string(), value);
        Ok(self)
    }

    /// Returns the value for in-place edits, e.g. of a JSON document.
    ///
    /// # Errors
    ///
    /// See [`Instance::attribute`].
    pub fn attribute_mut(&mut self, name: &str) -> Result<&mut Value> {
        self.attribute(name)?;
        Ok(self.current.entry(name.to_string()).or_default())
    }

    /// Returns a value of a column that is not an attribute, typed by
    /// heuristic when the row was loaded.
    #[must_use]
    pub fn ad_hoc(&self, name: &str) -> Option<&Value> {
        self.ad_hoc.get(name)
    }

    /// Returns the stored value, or null before the instance is persisted.
    #[must_use]
    pub fn attribute_was(&self, name: &str) -> Value {
        self.saved
            .as_ref()
            .and_then(|saved| saved.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns true if the current value differs from the stored one.
    #[must_use]
    pub fn attribute_changed(&self, name: &str) -> bool {
        self.model.has_attribute(name) && Self::differs(&self.current, self.saved.as_ref(), name)
    }

    /// Names of changed attributes, in definition order.
    #[must_use]
    pub fn changed(&self) -> Vec<String> {
        self.diff(&self.current)
    }

    /// All changed attributes with their stored and current values.
    #[must_use]
    pub fn changes(&self) -> Changes {
        self.changed()
            .into_iter()
            .map(|name| {
                let change = (self.attribute_was(&name), self.current[&name].clone());
                (name, change)
            })
            .collect()
    }

    /// The change of one attribute, empty if unchanged or unknown.
    #[must_use]
    pub fn changes_for(&self, name: &str) -> Changes {
        let mut changes = Changes::new();
        if self.attribute_changed(name) {
            changes.insert(
                name.to_string(),
                (self.attribute_was(name), self.current[name].clone()),
            );
        }
        changes
    }

    /// Returns true if the most recent write changed `name`.
    #[must_use]
    pub fn previous_changed(&self, name: &str) -> bool {
        match (&self.saved, &self.previous) {
            (Some(saved), Some(previous)) => {
                self.model.has_attribute(name) && Self::differs(saved, Some(previous), name)
            }
            _ => false,
        }
    }

    /// Names of attributes changed by the most recent write.
    #[must_use]
    pub fn previous_changed_attributes(&self) -> Vec<String> {
        self.model
            .registry()
            .iter()
            .map(|a| a.name().to_string())
            .filter(|name| self.previous_changed(name))
            .collect()
    }

    /// What the most recent write changed.
    #[must_use]
    pub fn previous_changes(&self) -> Changes {
        self.previous_changed_attributes()
            .into_iter()
            .map(|name| {
                let change = self.previous_change(&name);
                (name, change)
            })
            .collect()
    }

    /// What the most recent write changed of one attribute.
    #[must_use]
    pub fn previous_changes_for(&self, name: &str) -> Changes {
        let mut changes = Changes::new();
        if self.previous_changed(name) {
            changes.insert(name.to_string(), self.previous_change(name));
        }
        changes
    }

    /// Rotates snapshots after a successful write of every attribute.
    pub fn mark_saved(&mut self) {
        self.previous = self.saved.take();
        self.saved = Some(self.current.clone());
    }

    /// Rotates snapshots after a successful write of `names` only.
    pub fn mark_saved_only(&mut self, names: &[String]) {
        let mut saved = self.saved.clone().unwrap_or_default();
        for name in names {
            match self.current.get(name) {
                Some(value) => saved.insert(name.clone(), value.clone()),
                None => saved.remove(name),
            };
        }
        self.previous = self.saved.replace(saved);
    }

    /// Serializes non-null attribute values through their getters.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.to_map(false)
    }

    /// Serializes every loaded attribute through its getter, nulls included.
    #[must_use]
    pub fn to_object(&self) -> serde_json::Value {
        self.to_map(true)
    }

    fn to_map(&self, keep_nulls: bool) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for attribute in self.model.registry().iter() {
            if let Some(raw) = self.current.get(attribute.name()) {
                let value = attribute.accessor().get(raw);
                if keep_nulls || !value.is_null() {
                    map.insert(attribute.name().to_string(), value.to_json());
                }
            }
        }
        for (name, value) in &self.ad_hoc {
            if keep_nulls || !value.is_null() {
                map.entry(name.clone()).or_insert_with(|| value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }

    /// Names whose value in `values` differs from the stored snapshot.
    pub(crate) fn diff(&self, values: &Values) -> Vec<String> {
        self.model
            .registry()
            .iter()
            .map(|a| a.name().to_string())
            .filter(|name| Self::differs(values, self.saved.as_ref(), name))
            .collect()
    }

    /// A value differs from a persisted baseline that never loaded it, null
    /// included. Without a baseline it differs from null.
    fn differs(values: &Values, baseline: Option<&Values>, name: &str) -> bool {
        values.get(name).is_some_and(|value| match baseline {
            Some(baseline) => baseline.get(name) != Some(value),
            None => !value.is_null(),
        })
    }

    fn previous_change(&self, name: &str) -> (Value, Value) {
        let lookup = |snapshot: &Option<Values>| {
            snapshot
                .as_ref()
                .and_then(|s| s.get(name))
                .cloned()
                .unwrap_or_default()
        };
        (lookup(&self.previous), lookup(&self.saved))
    }

    fn unset_attribute(&self, name: &str) -> OrmError {
        OrmError::UnsetAttribute {
            model: self.model.name().to_string(),
            name: name.to_string(),
        }
    }
}
