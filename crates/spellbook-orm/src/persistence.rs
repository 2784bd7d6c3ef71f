//! Writing instances back to storage.
//!
//! Every operation validates locally before the driver is contacted and
//! rotates the instance snapshots only after the statement succeeded.

use spellbook_core::dialect::UpsertStyle;
use spellbook_core::{
    coerce, Condition, Spell, SqlValue, TimestampKind, Value, Values, WriteOptions,
};

use crate::driver::{Driver, QueryResult};
use crate::error::{OrmError, Result};
use crate::instance::Instance;
use crate::resolve;

impl Instance {
    /// Persists the instance.
    ///
    /// A new instance is inserted, or upserted when its primary key is
    /// already assigned. A persisted instance updates its changed
    /// attributes; without changes nothing is sent and 0 is returned.
    ///
    /// # Errors
    ///
    /// - [`OrmError::Persistence`] when the model has no primary key
    /// - [`OrmError::Database`] when the driver fails
    pub async fn save<D: Driver>(&mut self, driver: &D) -> Result<u64> {
        self.save_on(driver, None).await
    }

    /// [`Instance::save`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`Instance::save`].
    pub async fn save_with<D: Driver>(&mut self, driver: &D, conn: &mut D::Connection) -> Result<u64> {
        self.save_on(driver, Some(conn)).await
    }

    /// Assigns `values` and writes the changed attributes.
    ///
    /// Keys that are not attributes are ignored. `options.fields` restricts
    /// the written attributes (an empty list means all) and
    /// `options.silent` leaves `updatedAt` alone.
    ///
    /// # Errors
    ///
    /// - [`OrmError::Persistence`] when the instance is not persisted
    /// - [`OrmError::Validation`] when a setter rejects a value
    /// - [`OrmError::Database`] when the driver fails
    pub async fn update<D: Driver>(
        &mut self,
        driver: &D,
        values: Values,
        options: &WriteOptions,
    ) -> Result<u64> {
        self.update_on(driver, None, values, options).await
    }

    /// [`Instance::update`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`Instance::update`].
    pub async fn update_with<D: Driver>(
        &mut self,
        driver: &D,
        conn: &mut D::Connection,
        values: Values,
        options: &WriteOptions,
    ) -> Result<u64> {
        self.update_on(driver, Some(conn), values, options).await
    }

    /// Inserts the instance, or updates the row it conflicts with.
    ///
    /// `createdAt` is filled for the insert branch and never overwritten by
    /// the update branch. Returns 0 without contacting the driver when a
    /// persisted instance has no changes.
    ///
    /// Without a supplied primary key, the key of the affected row is
    /// assigned from `RETURNING`, from MySQL's reported id, or by selecting
    /// the row through the unique attribute it conflicted on. Otherwise it
    /// stays unassigned.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Capability`] or [`OrmError::Database`].
    pub async fn upsert<D: Driver>(&mut self, driver: &D) -> Result<u64> {
        self.upsert_on(driver, None).await
    }

    /// [`Instance::upsert`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`Instance::upsert`].
    pub async fn upsert_with<D: Driver>(&mut self, driver: &D, conn: &mut D::Connection) -> Result<u64> {
        self.upsert_on(driver, Some(conn)).await
    }

    /// Deletes the row. Paranoid models get their deleted marker set unless
    /// `force` is true.
    ///
    /// # Errors
    ///
    /// - [`OrmError::Persistence`] when the instance is not persisted or has
    ///   no primary key
    /// - [`OrmError::Database`] when the driver fails
    pub async fn remove<D: Driver>(&mut self, driver: &D, force: bool) -> Result<u64> {
        self.remove_on(driver, None, force).await
    }

    /// [`Instance::remove`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`Instance::remove`].
    pub async fn remove_with<D: Driver>(
        &mut self,
        driver: &D,
        conn: &mut D::Connection,
        force: bool,
    ) -> Result<u64> {
        self.remove_on(driver, Some(conn), force).await
    }

    /// Clears the deleted marker of a soft-deleted row.
    ///
    /// # Errors
    ///
    /// - [`OrmError::Persistence`] when the instance is not persisted
    /// - [`OrmError::NotParanoid`] when the model has no deleted marker
    /// - [`OrmError::Database`] when the driver fails
    pub async fn restore<D: Driver>(&mut self, driver: &D) -> Result<u64> {
        self.restore_on(driver, None).await
    }

    /// [`Instance::restore`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`Instance::restore`].
    pub async fn restore_with<D: Driver>(&mut self, driver: &D, conn: &mut D::Connection) -> Result<u64> {
        self.restore_on(driver, Some(conn)).await
    }

    /// Reloads every attribute from storage, soft-deleted rows included.
    ///
    /// # Errors
    ///
    /// - [`OrmError::Persistence`] when the instance is not persisted
    /// - [`OrmError::NotFound`] when the row is gone
    /// - [`OrmError::Database`] when the driver fails
    pub async fn reload<D: Driver>(&mut self, driver: &D) -> Result<()> {
        self.reload_on(driver, None).await
    }

    /// [`Instance::reload`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`Instance::reload`].
    pub async fn reload_with<D: Driver>(&mut self, driver: &D, conn: &mut D::Connection) -> Result<()> {
        self.reload_on(driver, Some(conn)).await
    }

    async fn save_on<D: Driver>(&mut self, driver: &D, conn: Option<&mut D::Connection>) -> Result<u64> {
        let pk = self.model.primary_key().to_string();
        if pk.is_empty() {
            return Err(OrmError::missing_primary_key());
        }
        if self.is_new_record() {
            if self.current.get(&pk).is_some_and(|v| !v.is_null()) {
                return self.upsert_on(driver, conn).await;
            }
            return self.insert_on(driver, conn).await;
        }
        let names = self.changed();
        let staged = self.current.clone();
        self.write_changes(driver, conn, staged, names, false).await
    }

    async fn insert_on<D: Driver>(&mut self, driver: &D, conn: Option<&mut D::Connection>) -> Result<u64> {
        let mut values = self.current.clone();
        self.fill_timestamps(&mut values, false);
        let spell = Spell::insert(self.model.table(), values.clone());
        let result = resolve::execute(driver, conn, &spell, self.model.registry()).await?;
        self.assign_generated_key(&mut values, &result, driver);
        self.current = values;
        self.mark_saved();
        Ok(result.affected_rows)
    }

    async fn update_on<D: Driver>(
        &mut self,
        driver: &D,
        conn: Option<&mut D::Connection>,
        values: Values,
        options: &WriteOptions,
    ) -> Result<u64> {
        if self.is_new_record() {
            return Err(OrmError::not_persisted());
        }
        let mut staged = self.current.clone();
        staged.extend(self.model.assign(values)?);
        let mut names = self.diff(&staged);
        if let Some(fields) = options.field_filter() {
            names.retain(|name| fields.contains(name));
        }
        self.write_changes(driver, conn, staged, names, options.silent)
            .await
    }

    /// Writes `names` from `staged` to the row, then adopts `staged` as the
    /// current values.
    async fn write_changes<D: Driver>(
        &mut self,
        driver: &D,
        conn: Option<&mut D::Connection>,
        mut staged: Values,
        mut names: Vec<String>,
        silent: bool,
    ) -> Result<u64> {
        let key = self.persisted_key()?;
        if names.is_empty() {
            return Ok(0);
        }
        if !silent {
            if let Some(updated) = self.model.timestamp(TimestampKind::Updated) {
                if !names.iter().any(|name| name == updated) {
                    staged.insert(updated.to_string(), Value::Timestamp(coerce::now()));
                    names.push(updated.to_string());
                }
            }
        }
        let values: Values = names
            .iter()
            .filter_map(|name| staged.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        let mut spell = Spell::update(self.model.table(), values)
            .filter(Condition::eq(self.model.primary_key(), key))
            .unparanoid();
        if silent {
            spell = spell.silent();
        }
        let result = resolve::execute(driver, conn, &spell, self.model.registry()).await?;
        self.current = staged;
        self.mark_saved_only(&names);
        Ok(result.affected_rows)
    }

    async fn upsert_on<D: Driver>(
        &mut self,
        driver: &D,
        mut conn: Option<&mut D::Connection>,
    ) -> Result<u64> {
        if !self.is_new_record() && self.changed().is_empty() {
            return Ok(0);
        }
        let mut values = self.current.clone();
        self.fill_timestamps(&mut values, true);
        let spell = Spell::upsert(self.model.table(), values.clone());
        let result =
            resolve::execute(driver, conn.as_deref_mut(), &spell, self.model.registry()).await?;
        if let Some((pk, id)) = self.upserted_key(driver, conn, &values, &result).await? {
            values.insert(pk, id);
        }
        self.current = values;
        self.mark_saved();
        Ok(result.affected_rows)
    }

    async fn remove_on<D: Driver>(
        &mut self,
        driver: &D,
        conn: Option<&mut D::Connection>,
        force: bool,
    ) -> Result<u64> {
        if self.is_new_record() {
            return Err(OrmError::not_persisted());
        }
        let key = self.persisted_key()?;
        let by_key = Condition::eq(self.model.primary_key(), key);

        if !force {
            if let Some(deleted) = self.model.timestamp(TimestampKind::Deleted) {
                let deleted = deleted.to_string();
                let now = Value::Timestamp(coerce::now());
                let mut values = Values::new();
                values.insert(deleted.clone(), now.clone());
                let spell = Spell::update(self.model.table(), values)
                    .filter(by_key)
                    .silent();
                let result = resolve::execute(driver, conn, &spell, self.model.registry()).await?;
                self.current.insert(deleted.clone(), now);
                self.mark_saved_only(&[deleted]);
                return Ok(result.affected_rows);
            }
        }

        let spell = Spell::delete(self.model.table()).filter(by_key).force();
        let result = resolve::execute(driver, conn, &spell, self.model.registry()).await?;
        Ok(result.affected_rows)
    }

    async fn restore_on<D: Driver>(&mut self, driver: &D, conn: Option<&mut D::Connection>) -> Result<u64> {
        if self.is_new_record() {
            return Err(OrmError::not_persisted());
        }
        let Some(deleted) = self.model.timestamp(TimestampKind::Deleted) else {
            return Err(OrmError::NotParanoid {
                model: self.model.name().to_string(),
            });
        };
        let deleted = deleted.to_string();
        let key = self.persisted_key()?;
        let mut values = Values::new();
        values.insert(deleted.clone(), Value::Null);
        let spell = Spell::update(self.model.table(), values)
            .filter(Condition::eq(self.model.primary_key(), key))
            .unparanoid()
            .silent();
        let result = resolve::execute(driver, conn, &spell, self.model.registry()).await?;
        self.current.insert(deleted.clone(), Value::Null);
        self.mark_saved_only(&[deleted]);
        Ok(result.affected_rows)
    }

    async fn reload_on<D: Driver>(&mut self, driver: &D, conn: Option<&mut D::Connection>) -> Result<()> {
        if self.is_new_record() {
            return Err(OrmError::not_persisted());
        }
        let key = self.persisted_key()?;
        let spell = Spell::select(self.model.table())
            .filter(Condition::eq(self.model.primary_key(), key))
            .unparanoid()
            .limit(1);
        let result = resolve::execute(driver, conn, &spell, self.model.registry()).await?;
        let row = result.rows.first().ok_or(OrmError::NotFound)?;
        *self = Self::instantiate(self.model.clone(), row, driver.dialect());
        Ok(())
    }

    /// The primary key value identifying the stored row.
    fn persisted_key(&self) -> Result<Value> {
        let pk = self.model.primary_key();
        if pk.is_empty() {
            return Err(OrmError::missing_primary_key());
        }
        self.saved
            .as_ref()
            .and_then(|saved| saved.get(pk))
            .or_else(|| self.current.get(pk))
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(OrmError::missing_primary_key)
    }

    /// Fills `createdAt`/`updatedAt` of an insert payload. With `touch`,
    /// `updatedAt` is refreshed unless it was assigned explicitly.
    fn fill_timestamps(&self, values: &mut Values, touch: bool) {
        let now = Value::Timestamp(coerce::now());
        if let Some(created) = self.model.timestamp(TimestampKind::Created) {
            if values.get(created).is_none_or(Value::is_null) {
                values.insert(created.to_string(), now.clone());
            }
        }
        if let Some(updated) = self.model.timestamp(TimestampKind::Updated) {
            let missing = values.get(updated).is_none_or(Value::is_null);
            if missing || (touch && !self.attribute_changed(updated)) {
                values.insert(updated.to_string(), now);
            }
        }
    }

    /// The primary key of the row an upsert landed on, when the caller did
    /// not supply one.
    ///
    /// `RETURNING` rows and MySQL's `LAST_INSERT_ID(pk)` identify the row on
    /// both branches. Other engines keep reporting the previous insert when
    /// the update branch runs, so the row is looked up again by the unique
    /// attribute it conflicted on. Without one the key stays unassigned.
    async fn upserted_key<D: Driver>(
        &self,
        driver: &D,
        conn: Option<&mut D::Connection>,
        values: &Values,
        result: &QueryResult,
    ) -> Result<Option<(String, Value)>> {
        let registry = self.model.registry();
        let Some(pk) = registry.primary_key() else {
            return Ok(None);
        };
        if values.get(pk.name()).is_some_and(|v| !v.is_null()) {
            return Ok(None);
        }
        let dialect = driver.dialect();
        let keyed = |wire: &SqlValue| (pk.name().to_string(), pk.cast(wire.clone(), dialect));

        if let Some(wire) = result.rows.first().and_then(|row| row.get(pk.column_name())) {
            return Ok(Some(keyed(wire)));
        }
        if dialect.capabilities().upsert == UpsertStyle::OnDuplicateKey {
            return Ok(result
                .last_insert_id
                .map(|id| (pk.name().to_string(), Value::Int(id))));
        }

        let target = registry
            .iter()
            .filter(|a| a.is_unique() && !a.is_primary_key())
            .find_map(|a| {
                values
                    .get(a.name())
                    .filter(|v| !v.is_null())
                    .map(|v| (a.name(), v.clone()))
            });
        let Some((name, value)) = target else {
            return Ok(None);
        };
        let spell = Spell::select(self.model.table())
            .columns([pk.name()])
            .filter(Condition::eq(name, value))
            .unparanoid()
            .limit(1);
        let found = resolve::execute(driver, conn, &spell, registry).await?;
        Ok(found
            .rows
            .first()
            .and_then(|row| row.get(pk.column_name()))
            .map(keyed))
    }

    /// Copies the generated primary key of a single-row insert into
    /// `values` when it was not supplied.
    fn assign_generated_key<D: Driver>(&self, values: &mut Values, result: &QueryResult, driver: &D) {
        let Some(pk) = self.model.registry().primary_key() else {
            return;
        };
        if values.get(pk.name()).is_some_and(|v| !v.is_null()) {
            return;
        }
        let returned = result
            .rows
            .first()
            .and_then(|row| row.get(pk.column_name()))
            .cloned();
        let id = returned
            .map(|wire| pk.cast(wire, driver.dialect()))
            .or_else(|| result.last_insert_id.map(Value::Int));
        if let Some(id) = id {
            values.insert(pk.name().to_string(), id);
        }
    }
}
