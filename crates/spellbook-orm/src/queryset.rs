//! Model-bound spells and their resolution.
//!
//! A [`QuerySet`] pairs a [`Spell`] with the model it targets. Chaining
//! returns a new query set and never touches the receiver; resolving
//! compiles and runs the spell again every time.

use std::sync::Arc;

use spellbook_core::{
    Aggregate, Command, Condition, Dialect, JoinKind, LockMode, OrderBy, Spell, SqlValue,
    WriteOptions,
};

use crate::collection::Collection;
use crate::driver::{Driver, QueryResult};
use crate::error::{OrmError, Result};
use crate::instance::Instance;
use crate::model::Model;
use crate::resolve;

/// A lazy query or mutation of one model.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use spellbook_core::dialect::SqliteDialect;
/// use spellbook_core::{Condition, DataType};
/// use spellbook_orm::Model;
///
/// let post = Arc::new(
///     Model::builder("Post")
///         .attribute("title", DataType::String)
///         .build()
///         .unwrap(),
/// );
/// let base = post.objects().find(Condition::like("title", "%Post%"));
/// let page = base.clone().order("id DESC").limit(10);
///
/// let (sql, _) = page.compile(&SqliteDialect).unwrap();
/// assert_eq!(
///     sql,
///     "SELECT * FROM \"posts\" WHERE \"title\" LIKE ? ORDER BY \"id\" DESC LIMIT 10"
/// );
/// assert!(base.spell().limit.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct QuerySet {
    model: Arc<Model>,
    spell: Spell,
}

impl QuerySet {
    /// Binds `spell` to `model`.
    #[must_use]
    pub const fn new(model: Arc<Model>, spell: Spell) -> Self {
        Self { model, spell }
    }

    /// Returns the model.
    #[must_use]
    pub const fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Returns the underlying spell.
    #[must_use]
    pub const fn spell(&self) -> &Spell {
        &self.spell
    }

    /// Compiles the spell for `dialect` without running it.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Capability`], [`OrmError::InvalidSpell`] or
    /// [`OrmError::MissingAttribute`].
    pub fn compile(&self, dialect: &dyn Dialect) -> Result<(String, Vec<SqlValue>)> {
        Ok(spellbook_core::compile(&self.spell, self.model.registry(), dialect)?)
    }

    fn map(mut self, f: impl FnOnce(Spell) -> Spell) -> Self {
        self.spell = f(self.spell);
        self
    }

    /// Adds a condition, AND-ed with the existing ones.
    #[must_use]
    pub fn filter(self, condition: Condition) -> Self {
        self.map(|spell| spell.filter(condition))
    }

    /// Adds a negated condition.
    #[must_use]
    pub fn exclude(self, condition: Condition) -> Self {
        self.map(|spell| spell.exclude(condition))
    }

    /// Selects only these attributes.
    #[must_use]
    pub fn select<S: Into<String>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        self.map(|spell| spell.columns(columns))
    }

    /// Adds an ordering: `"title"`, `"-title"` or `"title DESC"`.
    #[must_use]
    pub fn order(self, spec: &str) -> Self {
        self.map(|spell| spell.order(spec))
    }

    /// Limits the number of rows.
    #[must_use]
    pub fn limit(self, n: u64) -> Self {
        self.map(|spell| spell.limit(n))
    }

    /// Skips rows.
    #[must_use]
    pub fn offset(self, n: u64) -> Self {
        self.map(|spell| spell.offset(n))
    }

    /// Groups by these columns.
    #[must_use]
    pub fn group<S: Into<String>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        self.map(|spell| spell.group(columns))
    }

    /// Adds a HAVING condition.
    #[must_use]
    pub fn having(self, condition: Condition) -> Self {
        self.map(|spell| spell.having(condition))
    }

    /// Joins another table.
    #[must_use]
    pub fn join(self, kind: JoinKind, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.map(|spell| spell.join(kind, table, alias, on))
    }

    /// Locks the selected rows.
    #[must_use]
    pub fn lock(self, mode: LockMode) -> Self {
        self.map(|spell| spell.lock(mode))
    }

    /// Drops every default scope, the soft-delete filter included.
    #[must_use]
    pub fn unscoped(self) -> Self {
        self.map(Spell::unscoped)
    }

    /// Drops the soft-delete filter.
    #[must_use]
    pub fn unparanoid(self) -> Self {
        self.map(Spell::unparanoid)
    }

    /// Selects distinct rows.
    #[must_use]
    pub fn distinct(self) -> Self {
        self.map(Spell::distinct)
    }

    /// Replaces the write options.
    #[must_use]
    pub fn with_options(self, options: WriteOptions) -> Self {
        self.map(|spell| spell.with_options(options))
    }

    /// Leaves `updatedAt` alone on updates.
    #[must_use]
    pub fn silent(self) -> Self {
        self.map(Spell::silent)
    }

    /// Deletes physically, even on paranoid models.
    #[must_use]
    pub fn force(self) -> Self {
        self.map(Spell::force)
    }

    /// Resolves a select into instances.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn all<D: Driver>(&self, driver: &D) -> Result<Collection> {
        self.all_on(driver, None).await
    }

    /// [`QuerySet::all`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::all`].
    pub async fn all_with<D: Driver>(&self, driver: &D, conn: &mut D::Connection) -> Result<Collection> {
        self.all_on(driver, Some(conn)).await
    }

    /// Returns the first row by the current order, or by primary key.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn first<D: Driver>(&self, driver: &D) -> Result<Option<Instance>> {
        self.first_on(driver, None).await
    }

    /// [`QuerySet::first`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::first`].
    pub async fn first_with<D: Driver>(
        &self,
        driver: &D,
        conn: &mut D::Connection,
    ) -> Result<Option<Instance>> {
        self.first_on(driver, Some(conn)).await
    }

    /// Returns the last row by the current order, or by primary key.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn last<D: Driver>(&self, driver: &D) -> Result<Option<Instance>> {
        self.last_on(driver, None).await
    }

    /// [`QuerySet::last`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::last`].
    pub async fn last_with<D: Driver>(
        &self,
        driver: &D,
        conn: &mut D::Connection,
    ) -> Result<Option<Instance>> {
        self.last_on(driver, Some(conn)).await
    }

    /// Returns exactly one matching row.
    ///
    /// # Errors
    ///
    /// - [`OrmError::NotFound`] when nothing matches
    /// - [`OrmError::MultipleObjectsReturned`] when more than one row matches
    pub async fn get<D: Driver>(&self, driver: &D) -> Result<Instance> {
        self.get_on(driver, None).await
    }

    /// [`QuerySet::get`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::get`].
    pub async fn get_with<D: Driver>(&self, driver: &D, conn: &mut D::Connection) -> Result<Instance> {
        self.get_on(driver, Some(conn)).await
    }

    /// Counts matching rows.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn count<D: Driver>(&self, driver: &D) -> Result<u64> {
        self.count_on(driver, None).await
    }

    /// [`QuerySet::count`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::count`].
    pub async fn count_with<D: Driver>(&self, driver: &D, conn: &mut D::Connection) -> Result<u64> {
        self.count_on(driver, Some(conn)).await
    }

    /// Returns true if any row matches.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn exists<D: Driver>(&self, driver: &D) -> Result<bool> {
        Ok(self.count_on(driver, None).await? > 0)
    }

    /// [`QuerySet::exists`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::exists`].
    pub async fn exists_with<D: Driver>(&self, driver: &D, conn: &mut D::Connection) -> Result<bool> {
        Ok(self.count_on(driver, Some(conn)).await? > 0)
    }

    /// Computes an aggregate over matching rows; `None` for SQL NULL.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn aggregate<D: Driver>(&self, driver: &D, aggregate: Aggregate) -> Result<Option<f64>> {
        self.aggregate_on(driver, None, aggregate).await
    }

    /// [`QuerySet::aggregate`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::aggregate`].
    pub async fn aggregate_with<D: Driver>(
        &self,
        driver: &D,
        conn: &mut D::Connection,
        aggregate: Aggregate,
    ) -> Result<Option<f64>> {
        self.aggregate_on(driver, Some(conn), aggregate).await
    }

    /// Runs the spell and returns the affected rows, or the number of rows
    /// for a select.
    ///
    /// # Errors
    ///
    /// Returns compile errors or [`OrmError::Database`].
    pub async fn execute<D: Driver>(&self, driver: &D) -> Result<u64> {
        self.execute_on(driver, None).await
    }

    /// [`QuerySet::execute`] on an explicit connection.
    ///
    /// # Errors
    ///
    /// See [`QuerySet::execute`].
    pub async fn execute_with<D: Driver>(&self, driver: &D, conn: &mut D::Connection) -> Result<u64> {
        self.execute_on(driver, Some(conn)).await
    }

    async fn run<D: Driver>(
        &self,
        driver: &D,
        conn: Option<&mut D::Connection>,
        spell: &Spell,
    ) -> Result<QueryResult> {
        resolve::execute(driver, conn, spell, self.model.registry()).await
    }

    fn collect<D: Driver>(&self, driver: &D, result: &QueryResult) -> Collection {
        result
            .rows
            .iter()
            .map(|row| self.model.instantiate(row, driver.dialect()))
            .collect()
    }

    async fn all_on<D: Driver>(&self, driver: &D, conn: Option<&mut D::Connection>) -> Result<Collection> {
        let result = self.run(driver, conn, &self.spell).await?;
        Ok(self.collect(driver, &result))
    }

    async fn first_on<D: Driver>(
        &self,
        driver: &D,
        conn: Option<&mut D::Connection>,
    ) -> Result<Option<Instance>> {
        let mut spell = self.spell.clone();
        if spell.order_by.is_empty() {
            spell = spell.order_by(OrderBy::asc(self.model.primary_key()));
        }
        let result = self.run(driver, conn, &spell.limit(1)).await?;
        Ok(self.collect(driver, &result).into_vec().into_iter().next())
    }

    async fn last_on<D: Driver>(
        &self,
        driver: &D,
        conn: Option<&mut D::Connection>,
    ) -> Result<Option<Instance>> {
        let mut spell = self.spell.clone();
        spell.order_by = if spell.order_by.is_empty() {
            vec![OrderBy::desc(self.model.primary_key())]
        } else {
            spell.order_by.iter().map(OrderBy::reversed).collect()
        };
        let result = self.run(driver, conn, &spell.limit(1)).await?;
        Ok(self.collect(driver, &result).into_vec().into_iter().next())
    }

    async fn get_on<D: Driver>(&self, driver: &D, conn: Option<&mut D::Connection>) -> Result<Instance> {
        let spell = self.spell.clone().limit(2);
        let result = self.run(driver, conn, &spell).await?;
        let mut found = self.collect(driver, &result).into_vec();
        match found.len() {
            0 => Err(OrmError::NotFound),
            1 => found.pop().ok_or(OrmError::NotFound),
            _ => Err(OrmError::MultipleObjectsReturned),
        }
    }

    async fn count_on<D: Driver>(&self, driver: &D, conn: Option<&mut D::Connection>) -> Result<u64> {
        let count = self.aggregate_on(driver, conn, Aggregate::count_all()).await?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = count.map_or(0, |n| n.max(0.0) as u64);
        Ok(count)
    }

    async fn aggregate_on<D: Driver>(
        &self,
        driver: &D,
        conn: Option<&mut D::Connection>,
        aggregate: Aggregate,
    ) -> Result<Option<f64>> {
        let mut spell = self.spell.clone().aggregate(aggregate);
        spell.command = Command::Select;
        spell.order_by.clear();
        spell.limit = None;
        spell.offset = None;
        let result = self.run(driver, conn, &spell).await?;
        Ok(result.rows.first().and_then(|row| row.first()).and_then(scalar))
    }

    async fn execute_on<D: Driver>(&self, driver: &D, conn: Option<&mut D::Connection>) -> Result<u64> {
        let result = self.run(driver, conn, &self.spell).await?;
        if self.spell.command == Command::Select {
            return Ok(result.rows.len() as u64);
        }
        Ok(result.affected_rows)
    }
}

#[allow(clippy::cast_precision_loss)]
fn scalar(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Int(n) => Some(*n as f64),
        SqlValue::Float(f) => Some(*f),
        SqlValue::Text(s) => s.parse().ok(),
        SqlValue::Bool(b) => Some(f64::from(u8::from(*b))),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}
