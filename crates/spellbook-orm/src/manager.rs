//! Model-level helpers.
//!
//! The [`Manager`] of a model, reached with [`Model::objects`], starts query
//! sets and runs the operations that are not tied to one instance.

use std::sync::Arc;

use spellbook_core::dialect::InsertId;
use spellbook_core::{
    coerce, Condition, Dialect, Spell, TimestampKind, Value, Values, WriteOptions,
};

use crate::driver::{Driver, QueryResult, Row};
use crate::error::{OrmError, Result};
use crate::instance::Instance;
use crate::model::Model;
use crate::queryset::QuerySet;
use crate::resolve;

/// Query helpers of one model.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use spellbook_core::dialect::MysqlDialect;
/// use spellbook_core::{values, Condition, DataType, WriteOptions};
/// use spellbook_orm::Model;
///
/// let user = Arc::new(
///     Model::builder("User")
///         .attribute("nickname", DataType::String)
///         .attribute("level", DataType::Integer)
///         .build()
///         .unwrap(),
/// );
/// let update = user
///     .objects()
///     .update(
///         Some(Condition::eq("nickname", "yhorm")),
///         values! { "level" => 2 },
///         &WriteOptions::new(),
///     )
///     .unwrap()
///     .limit(1);
/// let (sql, _) = update.compile(&MysqlDialect).unwrap();
/// assert_eq!(sql, "UPDATE `users` SET `level` = ? WHERE `nickname` = ? LIMIT 1");
/// ```
#[derive(Debug, Clone)]
pub struct Manager {
    model: Arc<Model>,
}

impl Manager {
    /// Creates the manager of `model`.
    #[must_use]
    pub const fn new(model: Arc<Model>) -> Self {
        Self { model }
    }

    /// Returns the model.
    #[must_use]
    pub const fn model(&self) -> &Arc<Model> {
        &self.model
    }

    fn spell(&self, spell: Spell) -> QuerySet {
        QuerySet::new(Arc::clone(&self.model), spell)
    }

    /// Returns a query set for all rows.
    #[must_use]
    pub fn all(&self) -> QuerySet {
        self.spell(Spell::select(self.model.table()))
    }

    /// Returns a query set for rows matching `condition`.
    #[must_use]
    pub fn find(&self, condition: Condition) -> QuerySet {
        self.all().filter(condition)
    }

    /// Returns a query set that matches nothing.
    #[must_use]
    pub fn none(&self) -> QuerySet {
        self.all().filter(Condition::raw("1 = 0", Vec::<Value>::new()))
    }

    /// Selects only these attributes.
    #[must_use]
    pub fn select<S: Into<String>>(&self, columns: impl IntoIterator<Item = S>) -> QuerySet {
        self.all().select(columns)
    }

    /// Returns all rows in the given order.
    #[must_use]
    pub fn order(&self, spec: &str) -> QuerySet {
        self.all().order(spec)
    }

    /// Returns all rows without default scopes.
    #[must_use]
    pub fn unscoped(&self) -> QuerySet {
        self.all().unscoped()
    }

    /// Returns all rows, soft-deleted ones included.
    #[must_use]
    pub fn unparanoid(&self) -> QuerySet {
        self.all().unparanoid()
    }

    /// Returns the first row matching `condition`.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn find_one<D: Driver>(&self, driver: &D, condition: Condition) -> Result<Option<Instance>> {
        self.find(condition).first(driver).await
    }

    /// Returns the row with the given primary key.
    ///
    /// # Errors
    ///
    /// - [`OrmError::Persistence`] when the model has no primary key
    /// - [`OrmError::Database`] when the driver fails
    pub async fn find_by_pk<D: Driver>(
        &self,
        driver: &D,
        value: impl Into<Value>,
    ) -> Result<Option<Instance>> {
        let pk = self.model.primary_key();
        if pk.is_empty() {
            return Err(OrmError::missing_primary_key());
        }
        self.find(Condition::eq(pk, value)).first(driver).await
    }

    /// Returns the first row by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Database`] when the driver fails.
    pub async fn first<D: Driver>(&self, driver: &D) -> Result<Option<Instance>> {
        self.all().first(driver).await
    }

    /// Returns the last row by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Database`] when the driver fails.
    pub async fn last<D: Driver>(&self, driver: &D) -> Result<Option<Instance>> {
        self.all().last(driver).await
    }

    /// Counts all rows.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Database`] when the driver fails.
    pub async fn count<D: Driver>(&self, driver: &D) -> Result<u64> {
        self.all().count(driver).await
    }

    /// Creates an unsaved instance.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when a setter rejects a value.
    pub fn build(&self, values: Values) -> Result<Instance> {
        Instance::new(Arc::clone(&self.model), values)
    }

    /// Builds a persisted instance from a result row.
    #[must_use]
    pub fn instantiate(&self, row: &Row, dialect: &dyn Dialect) -> Instance {
        self.model.instantiate(row, dialect)
    }

    /// Creates and saves an instance.
    ///
    /// # Errors
    ///
    /// Returns validation errors or [`OrmError::Database`].
    pub async fn create<D: Driver>(&self, driver: &D, values: Values) -> Result<Instance> {
        let mut instance = self.build(values)?;
        instance.save(driver).await?;
        Ok(instance)
    }

    /// Inserts many rows with one statement.
    ///
    /// `None` resolves to `None` and an empty list to an empty list, both
    /// without contacting the driver. Generated keys are assigned to the
    /// returned instances when no row carried one and no
    /// `update_on_duplicate` was requested.
    ///
    /// # Errors
    ///
    /// Returns validation errors, [`OrmError::Capability`] or
    /// [`OrmError::Database`]. A failed batch inserts nothing.
    pub async fn bulk_create<D: Driver>(
        &self,
        driver: &D,
        rows: Option<Vec<Values>>,
        options: &WriteOptions,
    ) -> Result<Option<Vec<Instance>>> {
        let Some(rows) = rows else {
            return Ok(None);
        };
        if rows.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let mut instances = rows
            .into_iter()
            .map(|values| self.build(values))
            .collect::<Result<Vec<_>>>()?;
        let now = Value::Timestamp(coerce::now());
        for instance in &mut instances {
            for kind in [TimestampKind::Created, TimestampKind::Updated] {
                if let Some(name) = self.model.timestamp(kind) {
                    if instance.current.get(name).is_none_or(Value::is_null) {
                        instance.current.insert(name.to_string(), now.clone());
                    }
                }
            }
        }

        let payload = instances.iter().map(|i| i.current.clone()).collect();
        let spell = Spell::bulk_insert(self.model.table(), payload).with_options(options.clone());
        let result = resolve::execute(driver, None, &spell, self.model.registry()).await?;

        let pk = self.model.primary_key();
        let carried_key = instances
            .iter()
            .any(|i| i.current.get(pk).is_some_and(|v| !v.is_null()));
        if !pk.is_empty() && !carried_key && options.update_on_duplicate.is_none() {
            let ids = self.generated_keys(driver.dialect(), &result, instances.len());
            for (instance, id) in instances.iter_mut().zip(ids) {
                instance.current.insert(pk.to_string(), id);
            }
        }
        for instance in &mut instances {
            instance.mark_saved();
        }
        Ok(Some(instances))
    }

    /// Keys of a multi-row insert, from returned rows or derived from the
    /// id the driver reported.
    fn generated_keys(&self, dialect: &dyn Dialect, result: &QueryResult, count: usize) -> Vec<Value> {
        let Some(pk) = self.model.registry().primary_key() else {
            return Vec::new();
        };
        if result.rows.len() == count {
            return result
                .rows
                .iter()
                .filter_map(|row| row.get(pk.column_name()))
                .map(|wire| pk.cast(wire.clone(), dialect))
                .collect();
        }
        let Some(id) = result.last_insert_id else {
            return Vec::new();
        };
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let first = match dialect.capabilities().insert_id {
            InsertId::FirstRow => id,
            InsertId::LastRow => id - (count - 1),
            InsertId::Returning => return Vec::new(),
        };
        (0..count).map(|i| Value::Int(first + i)).collect()
    }

    /// Returns an update of the rows matching `condition`, all rows when
    /// `None`. Values pass through attribute setters.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when a setter rejects a value.
    pub fn update(
        &self,
        condition: Option<Condition>,
        values: Values,
        options: &WriteOptions,
    ) -> Result<QuerySet> {
        let values = self.model.assign(values)?;
        let mut spell = Spell::update(self.model.table(), values).with_options(options.clone());
        if let Some(condition) = condition {
            spell = spell.filter(condition);
        }
        Ok(self.spell(spell))
    }

    /// Returns a delete of the rows matching `condition`, soft for paranoid
    /// models unless `force` is true.
    #[must_use]
    pub fn remove(&self, condition: Option<Condition>, force: bool) -> QuerySet {
        let mut spell = Spell::delete(self.model.table());
        if let Some(condition) = condition {
            spell = spell.filter(condition);
        }
        if force {
            spell = spell.force();
        }
        self.spell(spell)
    }

    /// Returns an update clearing the deleted marker of matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotParanoid`] for models without a deleted marker.
    pub fn restore(&self, condition: Option<Condition>) -> Result<QuerySet> {
        let Some(deleted) = self.model.timestamp(TimestampKind::Deleted) else {
            return Err(OrmError::NotParanoid {
                model: self.model.name().to_string(),
            });
        };
        let mut values = Values::new();
        values.insert(deleted.to_string(), Value::Null);
        let mut spell = Spell::update(self.model.table(), values)
            .unparanoid()
            .silent();
        if let Some(condition) = condition {
            spell = spell.filter(condition);
        }
        Ok(self.spell(spell))
    }

    /// Inserts a row, or updates the row it conflicts with. Returns the
    /// engine's affected count, which is dialect specific.
    ///
    /// Attribute defaults apply as for [`Manager::build`].
    ///
    /// # Errors
    ///
    /// Returns validation errors, [`OrmError::Capability`] or
    /// [`OrmError::Database`].
    pub async fn upsert<D: Driver>(
        &self,
        driver: &D,
        values: Values,
        options: &WriteOptions,
    ) -> Result<u64> {
        let values = self.build(values)?.current;
        let spell = Spell::upsert(self.model.table(), values).with_options(options.clone());
        let result = resolve::execute(driver, None, &spell, self.model.registry()).await?;
        Ok(result.affected_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spellbook_core::dialect::{PostgresDialect, SqliteDialect};
    use spellbook_core::{values, Attribute, DataType};

    fn post() -> Arc<Model> {
        Arc::new(
            Model::builder("Post")
                .table("articles")
                .attribute("title", DataType::String)
                .attribute("deletedAt", Attribute::new(DataType::DateTime))
                .build()
                .unwrap(),
        )
    }

    fn user() -> Arc<Model> {
        Arc::new(
            Model::builder("User")
                .attribute("nickname", DataType::String)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_remove_is_soft_for_paranoid_models() {
        let (sql, _) = post()
            .objects()
            .remove(Some(Condition::eq("title", "A")), false)
            .compile(&PostgresDialect)
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"articles\" SET \"deleted_at\" = $1 WHERE \"title\" = $2 AND \"deleted_at\" IS NULL"
        );

        let (sql, _) = post()
            .objects()
            .remove(Some(Condition::eq("title", "A")), true)
            .compile(&PostgresDialect)
            .unwrap();
        assert_eq!(sql, "DELETE FROM \"articles\" WHERE \"title\" = $1");
    }

    #[test]
    fn test_restore_requires_paranoid_model() {
        assert!(matches!(
            user().objects().restore(None),
            Err(OrmError::NotParanoid { .. })
        ));
        let (sql, params) = post()
            .objects()
            .restore(Some(Condition::eq("title", "A")))
            .unwrap()
            .compile(&SqliteDialect)
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"articles\" SET \"deleted_at\" = ? WHERE \"title\" = ?"
        );
        assert_eq!(params[0], spellbook_core::SqlValue::Null);
    }

    #[test]
    fn test_none_matches_nothing() {
        let (sql, _) = user().objects().none().compile(&SqliteDialect).unwrap();
        assert_eq!(sql, "SELECT * FROM \"users\" WHERE 1 = 0");
    }

    #[test]
    fn test_generated_keys() {
        let objects = user().objects();
        let result = QueryResult {
            last_insert_id: Some(10),
            affected_rows: 3,
            ..QueryResult::default()
        };
        assert_eq!(
            objects.generated_keys(&SqliteDialect, &result, 3),
            vec![Value::Int(8), Value::Int(9), Value::Int(10)]
        );
        assert_eq!(
            objects.generated_keys(&spellbook_core::dialect::MysqlDialect, &result, 3),
            vec![Value::Int(10), Value::Int(11), Value::Int(12)]
        );
    }

    #[test]
    fn test_build_ignores_non_attributes() {
        let user = user().objects().build(values! { "nickname" => "x", "age" => 3 }).unwrap();
        assert!(user.is_new_record());
        assert!(user.changes().contains_key("nickname"));
        assert!(!user.changes().contains_key("age"));
    }
}
